//! Tabula Interchange - from tabular files to SQL table definitions
//!
//! ```text
//! CSV file → Dataset → Type Inference → TableSchema → column definitions / DDL
//!                                              ↑
//!                                     Identifier guard + quoting
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let dataset = read_dataset("cars.csv")?;
//! let definitions = build_definitions(&dataset);
//! assert_eq!(extract_names(&definitions), dataset.column_names());
//! ```

mod csv_import;
mod dataset;
mod identifier;
mod schema_builder;
mod type_inference;

pub use csv_import::{
    CsvOptions, infer_definitions_from_csv, parse_dataset, parse_value, read_dataset,
    read_dataset_with, table_name_from_path,
};
pub use dataset::{Column, Dataset, distinct_values};
pub use identifier::{
    IdentifierKind, RESERVED_KEYWORDS, is_safe, quote_identifier, validate_identifier,
};
pub use schema_builder::{ColumnDefinition, TableSchema, build_definitions, extract_names};
pub use type_inference::{SqlColumnType, infer_column_type, infer_schema};
