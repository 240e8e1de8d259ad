//! Single-column equality lookups

use tabula_core::{Connection, Result};
use tabula_interchange::{IdentifierKind, quote_identifier, validate_identifier};

/// Build `SELECT * FROM "<table>" WHERE "<column>" = <placeholder>`.
///
/// Both identifiers are checked against the reserved keywords and quoted;
/// the value is always bound as parameter 1.
pub fn equality_lookup_sql(conn: &dyn Connection, table: &str, column: &str) -> Result<String> {
    validate_identifier(IdentifierKind::Table, table)?;
    validate_identifier(IdentifierKind::Column, column)?;
    Ok(format!(
        "SELECT * FROM {} WHERE {} = {}",
        quote_identifier(table),
        quote_identifier(column),
        conn.placeholder(1)
    ))
}
