//! SQL column type inference from dataset values

use std::str::FromStr;
use tabula_core::{TabulaError, Value};

use crate::{ColumnDefinition, Dataset, TableSchema};

/// The column types a dataset column can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlColumnType {
    Int,
    BigInt,
    Float,
    Varchar,
}

impl SqlColumnType {
    /// DDL token for this type
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlColumnType::Int => "INT",
            SqlColumnType::BigInt => "BIGINT",
            SqlColumnType::Float => "FLOAT",
            SqlColumnType::Varchar => "VARCHAR(255)",
        }
    }

    /// Convert a cell into the value bound for a column of this type.
    ///
    /// `Null` stays `Null`. Values that cannot be represented are passed
    /// through unchanged for the database to reject.
    pub fn coerce(&self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (SqlColumnType::Int, Value::Int64(v)) => i32::try_from(*v)
                .map(Value::Int32)
                .unwrap_or(Value::Int64(*v)),
            (SqlColumnType::BigInt, Value::Int32(v)) => Value::Int64(i64::from(*v)),
            (SqlColumnType::Float, Value::Int32(v)) => Value::Float64(f64::from(*v)),
            (SqlColumnType::Float, Value::Int64(v)) => Value::Float64(*v as f64),
            (SqlColumnType::Varchar, Value::String(_)) => value.clone(),
            (SqlColumnType::Varchar, Value::Bytes(b)) => {
                Value::String(String::from_utf8_lossy(b).into_owned())
            }
            (SqlColumnType::Varchar, other) => Value::String(other.to_string()),
            (_, other) => other.clone(),
        }
    }

    /// Like [`SqlColumnType::coerce`], but a text column binds `text`, the
    /// cell as written in its source, when there is one.
    pub fn coerce_cell(&self, value: &Value, text: Option<&str>) -> Value {
        match (self, text) {
            (SqlColumnType::Varchar, Some(text)) if !value.is_null() => {
                Value::String(text.to_string())
            }
            _ => self.coerce(value),
        }
    }
}

impl std::fmt::Display for SqlColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for SqlColumnType {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INT" => Ok(SqlColumnType::Int),
            "BIGINT" => Ok(SqlColumnType::BigInt),
            "FLOAT" => Ok(SqlColumnType::Float),
            "VARCHAR(255)" => Ok(SqlColumnType::Varchar),
            _ => Err(TabulaError::Schema(format!("unsupported column type: {}", s))),
        }
    }
}

enum Observed {
    Nothing,
    Integer { min: i64, max: i64 },
    Float,
}

/// Infer the SQL type of one column.
///
/// All integers within the 32-bit range give `INT`, wider integers `BIGINT`;
/// any float among the numbers gives `FLOAT`; anything else, or a column
/// with no values at all, gives `VARCHAR(255)`.
pub fn infer_column_type(values: &[Value]) -> SqlColumnType {
    let mut observed = Observed::Nothing;

    for value in values {
        observed = match (observed, value) {
            (state, Value::Null) => state,
            (Observed::Nothing, Value::Int32(_) | Value::Int64(_)) => {
                let v = value.as_i64().unwrap_or_default();
                Observed::Integer { min: v, max: v }
            }
            (Observed::Integer { min, max }, Value::Int32(_) | Value::Int64(_)) => {
                let v = value.as_i64().unwrap_or_default();
                Observed::Integer {
                    min: min.min(v),
                    max: max.max(v),
                }
            }
            (Observed::Float, Value::Int32(_) | Value::Int64(_)) => Observed::Float,
            (Observed::Nothing | Observed::Integer { .. } | Observed::Float, Value::Float64(_)) => {
                Observed::Float
            }
            (_, Value::String(_) | Value::Bool(_) | Value::Bytes(_)) => {
                return SqlColumnType::Varchar;
            }
        };
    }

    match observed {
        Observed::Integer { min, max } if min < i64::from(i32::MIN) || max > i64::from(i32::MAX) => {
            SqlColumnType::BigInt
        }
        Observed::Integer { .. } => SqlColumnType::Int,
        Observed::Float => SqlColumnType::Float,
        Observed::Nothing => SqlColumnType::Varchar,
    }
}

/// Infer a definition for every column of `dataset`, in column order
pub fn infer_schema(dataset: &Dataset) -> TableSchema {
    let columns = dataset
        .columns()
        .iter()
        .map(|column| {
            let column_type = infer_column_type(&column.values);
            tracing::debug!(column = %column.name, %column_type, "inferred column type");
            ColumnDefinition::new(column.name.clone(), column_type)
        })
        .collect();
    TableSchema::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int64).collect()
    }

    #[rstest]
    #[case(ints(&[1, 2, 3]), SqlColumnType::Int)]
    #[case(ints(&[-2147483648, 2147483647]), SqlColumnType::Int)]
    #[case(ints(&[0, 2147483648]), SqlColumnType::BigInt)]
    #[case(ints(&[-2147483649, 5]), SqlColumnType::BigInt)]
    #[case(vec![Value::Int64(1), Value::Float64(2.5)], SqlColumnType::Float)]
    #[case(vec![Value::Float64(2.5), Value::Int64(1)], SqlColumnType::Float)]
    #[case(vec![Value::Float64(1.0)], SqlColumnType::Float)]
    #[case(vec![Value::Int64(1), Value::from("x")], SqlColumnType::Varchar)]
    #[case(vec![Value::from("x"), Value::Int64(1)], SqlColumnType::Varchar)]
    #[case(vec![Value::Bool(true)], SqlColumnType::Varchar)]
    #[case(vec![Value::Null, Value::Null], SqlColumnType::Varchar)]
    #[case(vec![], SqlColumnType::Varchar)]
    #[case(vec![Value::Null, Value::Int64(7), Value::Null], SqlColumnType::Int)]
    fn column_types(#[case] values: Vec<Value>, #[case] expected: SqlColumnType) {
        assert_eq!(infer_column_type(&values), expected);
    }

    #[test]
    fn scenario_wide_ids_and_names() {
        let dataset = Dataset::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int64(1), Value::from("a")],
                vec![Value::Int64(2), Value::from("b")],
                vec![Value::Int64(300000000000), Value::from("c")],
            ],
        )
        .unwrap();
        let schema = infer_schema(&dataset);
        assert_eq!(
            schema.column_definitions_sql(),
            vec!["\"id\" BIGINT", "\"name\" VARCHAR(255)"]
        );
    }

    #[test]
    fn empty_dataset_has_empty_schema() {
        assert!(infer_schema(&Dataset::default()).is_empty());
    }

    #[rstest]
    #[case("INT", SqlColumnType::Int)]
    #[case("bigint", SqlColumnType::BigInt)]
    #[case(" Float ", SqlColumnType::Float)]
    #[case("varchar(255)", SqlColumnType::Varchar)]
    fn type_tokens_parse(#[case] token: &str, #[case] expected: SqlColumnType) {
        assert_eq!(token.parse::<SqlColumnType>().unwrap(), expected);
        assert_eq!(expected.as_sql().parse::<SqlColumnType>().unwrap(), expected);
    }

    #[rstest]
    #[case("TEXT")]
    #[case("VARCHAR(10)")]
    #[case("INT); DROP TABLE cars; --")]
    #[case("")]
    fn other_tokens_are_schema_errors(#[case] token: &str) {
        let err = token.parse::<SqlColumnType>().unwrap_err();
        assert_eq!(err.kind(), tabula_core::ErrorKind::Schema);
    }

    #[test]
    fn coercion_matches_column_type() {
        assert_eq!(SqlColumnType::Int.coerce(&Value::Int64(5)), Value::Int32(5));
        assert_eq!(
            SqlColumnType::BigInt.coerce(&Value::Int32(5)),
            Value::Int64(5)
        );
        assert_eq!(
            SqlColumnType::Float.coerce(&Value::Int64(5)),
            Value::Float64(5.0)
        );
        assert_eq!(
            SqlColumnType::Varchar.coerce(&Value::Float64(2.5)),
            Value::from("2.5")
        );
        assert_eq!(SqlColumnType::Varchar.coerce(&Value::Null), Value::Null);
    }
}
