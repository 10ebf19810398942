use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::Table;

use super::normalize::FlattenedRecord;
use crate::error::{AuditError, Result};

pub const DELIMITER: &str = ",";

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Encodes records as delimited text.
///
/// The header is taken from the fields present in the first record. Values
/// are written verbatim; a column missing from a later record is left empty.
///
/// # Errors
///
/// Returns [`AuditError::EmptyInput`] when `records` is empty.
pub fn encode(records: &[FlattenedRecord]) -> Result<String> {
    let first = records.first().ok_or(AuditError::EmptyInput)?;
    let header: Vec<&'static str> = first.columns().into_iter().map(|(name, _)| name).collect();
    let mut text = header.join(DELIMITER);
    text.push_str(LINE_ENDING);

    for record in records {
        let columns = record.columns();
        let row: Vec<&str> = header
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .find(|(column, _)| column == name)
                    .map_or("", |(_, value)| value.as_str())
            })
            .collect();
        text.push_str(&row.join(DELIMITER));
        text.push_str(LINE_ENDING);
    }

    Ok(text)
}

/// Splits encoded text back into rows of fields.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split(DELIMITER).map(str::to_owned).collect())
        .collect()
}

/// Renders encoded text as a Markdown table, first row as header.
pub fn to_markdown(text: &str) -> String {
    let mut rows = parse_rows(text).into_iter();
    let Some(header) = rows.next() else {
        return String::new();
    };

    let escape = |cell: String| cell.replace('|', "\\|");

    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_header(header.into_iter().map(escape));
    for row in rows {
        table.add_row(row.into_iter().map(escape));
    }

    table.to_string()
}
