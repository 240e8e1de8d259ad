//! Column definitions and CREATE TABLE rendering

use tabula_core::{Result, TabulaError};

use crate::{Dataset, SqlColumnType, infer_schema, quote_identifier};

/// A column name paired with its SQL type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: SqlColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: SqlColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Render as `"<name>" <TYPE>`
    pub fn to_sql(&self) -> String {
        format!("{} {}", quote_identifier(&self.name), self.column_type)
    }

    /// Parse a rendered definition, accepting unquoted `name TYPE` as well
    pub fn parse(definition: &str) -> Result<Self> {
        let (name, rest) = split_definition(definition);
        let column_type = rest.parse::<SqlColumnType>().map_err(|_| {
            TabulaError::Schema(format!(
                "unsupported column type in definition: {}",
                definition
            ))
        })?;
        Ok(Self { name, column_type })
    }
}

/// Ordered column definitions for one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    /// Parse rendered definitions back into a schema
    pub fn from_definitions<S: AsRef<str>>(definitions: &[S]) -> Result<Self> {
        let columns = definitions
            .iter()
            .map(|d| ColumnDefinition::parse(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Each column rendered as `"<name>" <TYPE>`
    pub fn column_definitions_sql(&self) -> Vec<String> {
        self.columns.iter().map(ColumnDefinition::to_sql).collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for `table_name`
    pub fn create_table_sql(&self, table_name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(table_name),
            self.column_definitions_sql().join(", ")
        )
    }
}

/// Render the inferred definition of every dataset column
pub fn build_definitions(dataset: &Dataset) -> Vec<String> {
    infer_schema(dataset).column_definitions_sql()
}

/// Recover bare column names from rendered definitions, in order
pub fn extract_names<S: AsRef<str>>(definitions: &[S]) -> Vec<String> {
    definitions
        .iter()
        .map(|d| split_definition(d.as_ref()).0)
        .collect()
}

/// Split a definition into its unquoted name and the remaining type text.
///
/// A quoted name ends at the first quote not followed by another quote.
/// An unquoted name ends at the first whitespace.
fn split_definition(definition: &str) -> (String, &str) {
    let trimmed = definition.trim_start();
    let Some(quoted) = trimmed.strip_prefix('"') else {
        return match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name.to_string(), rest.trim()),
            None => (trimmed.to_string(), ""),
        };
    };

    let mut name = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if c == '"' {
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                name.push('"');
            } else {
                return (name, quoted[index + 1..].trim());
            }
        } else {
            name.push(c);
        }
    }

    // Unterminated quote: the whole remainder is the name
    (name, "")
}
