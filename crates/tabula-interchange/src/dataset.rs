//! In-memory tabular dataset

use tabula_core::{Result, TabulaError, Value};

use crate::{SqlColumnType, infer_column_type, parse_value};

/// A named column of cells; `Value::Null` marks a missing cell
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
    /// Cell text as read from a file, parallel to `values`
    text: Option<Vec<String>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
            text: None,
        }
    }

    /// Type each cell of `cells` and keep the text alongside
    pub fn from_text(name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: cells.iter().map(|cell| parse_value(cell)).collect(),
            text: Some(cells),
        }
    }

    /// Source text of cell `index`, for columns read from text
    pub fn text(&self, index: usize) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(|cells| cells.get(index))
            .map(String::as_str)
    }

    /// Cell `index` as stored in a column of `column_type`
    pub fn cell(&self, index: usize, column_type: SqlColumnType) -> Value {
        match self.values.get(index) {
            Some(value) => column_type.coerce_cell(value, self.text(index)),
            None => Value::Null,
        }
    }
}

/// Ordered named columns that all hold the same number of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset, rejecting columns of unequal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(ragged) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(TabulaError::Schema(format!(
                "column '{}' has {} values, expected {}",
                ragged.name,
                ragged.values.len(),
                row_count
            )));
        }
        Ok(Self { columns, row_count })
    }

    /// Build a dataset from row-major cells
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Column> = column_names
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TabulaError::Schema(format!(
                    "row {} has {} values, expected {}",
                    index + 1,
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Find a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Cells of row `index` in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count).map(|index| self.columns.iter().map(|c| &c.values[index]).collect())
    }
}

/// Unique non-null values of `column` in first-seen order.
///
/// Text columns report cells as written in the source file.
pub fn distinct_values(dataset: &Dataset, column: &str) -> Result<Vec<Value>> {
    let column = dataset
        .column(column)
        .ok_or_else(|| TabulaError::Schema(format!("no column named '{}'", column)))?;
    let column_type = infer_column_type(&column.values);

    let mut seen: Vec<Value> = Vec::new();
    for (index, value) in column.values.iter().enumerate() {
        if value.is_null() {
            continue;
        }
        let value = match column_type {
            SqlColumnType::Varchar => column.cell(index, column_type),
            _ => value.clone(),
        };
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    Ok(seen)
}
