//! CSV reading into a [`Dataset`]

use std::io::{BufRead, BufReader};
use std::path::Path;
use tabula_core::{Result, TabulaError, Value};

use crate::{Column, Dataset, build_definitions};

/// Options for reading delimited text
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

/// Read a comma-separated file whose first line is the header row
pub fn read_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    read_dataset_with(path, &CsvOptions::default())
}

/// Read a delimited file with explicit options
#[tracing::instrument(skip(path, options), fields(path = %path.as_ref().display()))]
pub fn read_dataset_with(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        TabulaError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let dataset = parse_dataset(BufReader::new(file), options)?;
    tracing::debug!(
        columns = dataset.column_count(),
        rows = dataset.row_count(),
        "read dataset"
    );
    Ok(dataset)
}

/// Parse delimited text from any reader.
///
/// Blank lines are skipped. An empty field is a missing value; other fields
/// become `Int64`, `Float64` or `String`, whichever parses first. The field
/// text is kept so text columns store cells as written. A record with a
/// different field count than the header is a parse error.
pub fn parse_dataset(reader: impl BufRead, options: &CsvOptions) -> Result<Dataset> {
    let mut lines = reader.lines().enumerate();

    let mut headers = None;
    for (index, line) in lines.by_ref() {
        let line = line?;
        let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        tracing::trace!(line = index + 1, "header row");
        headers = Some(header_names(parse_csv_line(line, options.delimiter)));
        break;
    }
    let Some(headers) = headers else {
        return Ok(Dataset::default());
    };

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(&line, options.delimiter);
        if fields.len() != headers.len() {
            return Err(TabulaError::Parse {
                line: index + 1,
                message: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    fields.len()
                ),
            });
        }
        for (column, field) in cells.iter_mut().zip(fields) {
            column.push(field);
        }
    }

    Dataset::new(
        headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::from_text(name, cells))
            .collect(),
    )
}

/// Read a file and render its inferred column definitions
pub fn infer_definitions_from_csv(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let dataset = read_dataset(path)?;
    Ok(build_definitions(&dataset))
}

/// Table name for a data file: its stem, lowercased
pub fn table_name_from_path(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_lowercase)
        .ok_or_else(|| {
            TabulaError::Validation(format!(
                "Cannot derive a table name from {}",
                path.display()
            ))
        })
}

fn parse_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            result.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }

    result.push(current.trim().to_string());
    result
}

/// Name blank headers by position and suffix repeated ones (`a`, `a.1`, ...)
fn header_names(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for (index, header) in raw.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

/// Type a single text field the way CSV cells are typed
pub fn parse_value(field: &str) -> Value {
    parse_field(field.trim().to_string())
}

fn parse_field(field: String) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = field.parse::<i64>() {
        return Value::Int64(v);
    }
    // "inf" and "nan" parse as f64 but are kept as text
    if field.bytes().any(|b| b.is_ascii_digit())
        && let Ok(v) = field.parse::<f64>()
        && v.is_finite()
    {
        return Value::Float64(v);
    }
    Value::String(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Dataset> {
        parse_dataset(text.as_bytes(), &CsvOptions::default())
    }

    #[test]
    fn test_parse_simple_csv() {
        assert_eq!(parse_csv_line("hello,world,test", ','), vec!["hello", "world", "test"]);
    }

    #[test]
    fn test_parse_quoted_csv() {
        let line = r#""hello, world","test",value"#;
        assert_eq!(parse_csv_line(line, ','), vec!["hello, world", "test", "value"]);
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let line = r#""hello ""world""","test""#;
        assert_eq!(parse_csv_line(line, ','), vec![r#"hello "world""#, "test"]);
    }

    #[test]
    fn fields_are_typed() {
        let dataset = parse(indoc! {"
            id,Make,Price,Note
            1,Audi,20000.5,
            2,BMW,,\"2\"
        "})
        .unwrap();

        assert_eq!(dataset.column_names(), vec!["id", "Make", "Price", "Note"]);
        assert_eq!(
            dataset.row(0).unwrap(),
            vec![
                &Value::Int64(1),
                &Value::from("Audi"),
                &Value::Float64(20000.5),
                &Value::Null
            ]
        );
        assert_eq!(
            dataset.row(1).unwrap(),
            vec![
                &Value::Int64(2),
                &Value::from("BMW"),
                &Value::Null,
                &Value::Int64(2)
            ]
        );
    }

    #[test]
    fn field_text_is_kept_next_to_the_typed_value() {
        let dataset = parse("id,code\n1,A1\n2,007\n3,\n").unwrap();
        let code = dataset.column("code").unwrap();
        assert_eq!(code.values[1], Value::Int64(7));
        assert_eq!(code.text(1), Some("007"));
        assert_eq!(code.values[2], Value::Null);
    }

    #[test]
    fn blank_lines_and_bom_are_ignored() {
        let dataset = parse("\u{feff}a,b\n\n1,2\n   \n3,4\n").unwrap();
        assert_eq!(dataset.column_names(), vec!["a", "b"]);
        assert_eq!(dataset.row_count(), 2);
    }

    #[test]
    fn ragged_record_reports_its_line() {
        let err = parse("a,b\n1,2\n3\n").unwrap_err();
        match err {
            TabulaError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert_eq!(message, "expected 2 fields, found 1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_words_stay_text() {
        let dataset = parse("x\nnan\ninf\n1e3\n").unwrap();
        assert_eq!(
            dataset.columns()[0].values,
            vec![Value::from("nan"), Value::from("inf"), Value::Float64(1000.0)]
        );
    }

    #[test]
    fn blank_and_repeated_headers_are_renamed() {
        let dataset = parse("a,,a,a\n1,2,3,4\n").unwrap();
        assert_eq!(
            dataset.column_names(),
            vec!["a", "Unnamed: 1", "a.1", "a.2"]
        );
    }

    #[test]
    fn empty_input_is_an_empty_dataset() {
        let dataset = parse("").unwrap();
        assert_eq!(dataset.column_count(), 0);
    }

    #[test]
    fn custom_delimiter() {
        let options = CsvOptions { delimiter: ';' };
        let dataset = parse_dataset("a;b\n1,5;x\n".as_bytes(), &options).unwrap();
        assert_eq!(dataset.columns()[0].values, vec![Value::from("1,5")]);
    }

    #[test]
    fn single_values_are_typed_like_cells() {
        assert_eq!(parse_value(" 42 "), Value::Int64(42));
        assert_eq!(parse_value("4.5"), Value::Float64(4.5));
        assert_eq!(parse_value("Audi"), Value::from("Audi"));
        assert_eq!(parse_value(""), Value::Null);
    }

    #[test]
    fn table_names_come_from_the_lowercased_stem() {
        assert_eq!(table_name_from_path("/data/Cars.csv").unwrap(), "cars");
        assert_eq!(table_name_from_path("Sales 2024.CSV").unwrap(), "sales 2024");
        assert!(table_name_from_path("/").is_err());
    }
}
