use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cells(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Admin-heavy repositories are highlighted.
pub fn color_coded_admin_cell(admins: usize, collaborators: usize) -> Cell {
    let text = admins.to_string();
    if collaborators == 0 || admins == 0 {
        Cell::new(text)
    } else if admins * 2 > collaborators {
        Cell::new(text).fg(TableColor::Red)
    } else if admins * 4 > collaborators {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Green)
    }
}
