use std::fmt::Write;

use comfy_table::Cell;

use super::styling::{count, enterprise, heading, muted, permission, PERMISSION_LEVELS};
use super::tables::{color_coded_admin_cell, create_table, header_cells};
use crate::collector::types::{OrganizationResult, Permission};
use crate::collector::RunContext;

/// Prints a per-organization overview of the run to stderr.
pub fn print_summary(context: &RunContext, records: usize) {
    eprintln!("{}", render_summary(context, records));
}

fn admin_count(result: &OrganizationResult) -> usize {
    result
        .repositories
        .iter()
        .flat_map(|r| &r.collaborators)
        .filter(|c| c.permission == Permission::Admin)
        .count()
}

/// Collaborator grants per permission level across every organization.
fn grant_breakdown(context: &RunContext) -> Vec<(Permission, usize)> {
    let edges: Vec<_> = context
        .results
        .values()
        .flatten()
        .flat_map(|result| &result.repositories)
        .flat_map(|repository| &repository.collaborators)
        .collect();

    PERMISSION_LEVELS
        .into_iter()
        .map(|level| (level, edges.iter().filter(|c| c.permission == level).count()))
        .filter(|(_, grants)| *grants > 0)
        .collect()
}

fn render_summary(context: &RunContext, records: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "📊 {}", heading("Overview"));
    if let Some(slug) = &context.enterprise {
        let _ = writeln!(output, "  {} {}", muted("Enterprise:"), enterprise(slug));
    }
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}",
        muted("Organizations:"),
        count(context.results.len()),
        muted("Records:"),
        count(records),
    );
    let grants: Vec<String> = grant_breakdown(context)
        .into_iter()
        .map(|(level, grants)| format!("{} {}", permission(level), count(grants)))
        .collect();
    if !grants.is_empty() {
        let _ = writeln!(output, "  {} {}", muted("Grants:"), grants.join("  "));
    }
    let _ = writeln!(output);

    let mut table = create_table();
    table.set_header(header_cells(&[
        "Organization",
        "Repositories",
        "Collaborators",
        "Admin grants",
        "SAML identities",
    ]));

    for (login, result) in &context.results {
        match result {
            Some(result) => {
                let collaborators = result.collaborator_count();
                table.add_row(vec![
                    Cell::new(login),
                    Cell::new(result.repositories.len()),
                    Cell::new(collaborators),
                    color_coded_admin_cell(admin_count(result), collaborators),
                    Cell::new(
                        result
                            .saml
                            .as_ref()
                            .map_or_else(|| "-".to_string(), |s| s.identities.len().to_string()),
                    ),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(login),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    let _ = writeln!(output, "{table}");
    output
}
