use std::fmt::Display;

use console::{style, StyledObject};

use crate::collector::types::Permission;

/// Every permission level, strongest first.
pub const PERMISSION_LEVELS: [Permission; 5] = [
    Permission::Admin,
    Permission::Maintain,
    Permission::Write,
    Permission::Triage,
    Permission::Read,
];

/// Colors a permission label by how much access it grants.
pub fn permission(level: Permission) -> StyledObject<String> {
    let label = style(level.to_string());
    match level {
        Permission::Admin => label.red().bold(),
        Permission::Maintain => label.yellow().bold(),
        Permission::Write => label.yellow(),
        Permission::Triage => label.green(),
        Permission::Read => label.dim(),
    }
}

/// Organization still being crawled.
pub fn collecting(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn collected(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn failed(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn count(value: usize) -> StyledObject<String> {
    style(value.to_string()).bright().yellow()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn enterprise(slug: &str) -> StyledObject<String> {
    style(slug.to_string()).cyan()
}

pub fn banner(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
