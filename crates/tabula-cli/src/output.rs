//! Terminal rendering of rows and value lists

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use tabula_core::{Row, Value};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One row under its column headers
pub fn row_table(row: &Row) -> Table {
    let mut table = new_table();
    table.set_header(row.columns().to_vec());
    table.add_row(row.values.iter().map(Value::to_string).collect::<Vec<_>>());
    table
}

/// A single column of values, one per line
pub fn values_table(column: &str, values: &[Value]) -> Table {
    let mut table = new_table();
    table.set_header(vec![column.to_string()]);
    for value in values {
        table.add_row(vec![value.to_string()]);
    }
    table
}
