//! SQLite connection implementation

use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::time::{Duration, Instant};
use tabula_core::{Connection, QueryResult, Result, Row, StatementResult, TabulaError, Value};

/// SQLite connection wrapper.
///
/// The inner handle is taken on [`Connection::close`], after which every call
/// fails with a connection error.
pub struct SqliteConnection {
    conn: Option<RusqliteConnection>,
    path: String,
}

impl SqliteConnection {
    /// Open a SQLite database, creating the file if needed
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                TabulaError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(TabulaError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                TabulaError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            TabulaError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| TabulaError::Connection(format!("Failed to set busy timeout: {}", e)))?;

        tracing::debug!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Some(conn),
            path: expanded_path,
        })
    }

    /// Resolved path of the database file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Expand `~/` and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match std::env::var_os("HOME") {
                Some(home) => std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string(),
                None => {
                    return Err(TabulaError::Configuration(
                        "Unable to determine HOME directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(TabulaError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        if path_buf.is_relative() {
            Ok(std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string())
        } else {
            Ok(expanded)
        }
    }

    fn handle(&self) -> Result<&RusqliteConnection> {
        self.conn
            .as_ref()
            .ok_or_else(|| TabulaError::Connection("SQLite connection is closed".into()))
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.handle()?;
        let rusqlite_params = values_to_rusqlite(params);

        let rows_affected = conn
            .execute(sql, params_from_iter(rusqlite_params.iter()))
            .map_err(|e| TabulaError::Statement(format!("Failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected as u64,
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = Instant::now();
        let conn = self.handle()?;
        let rusqlite_params = values_to_rusqlite(params);

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| TabulaError::Statement(format!("Failed to prepare query: {}", e)))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        let mut query_rows = stmt
            .query(params_from_iter(rusqlite_params.iter()))
            .map_err(|e| TabulaError::Statement(format!("Failed to execute query: {}", e)))?;

        while let Some(row) = query_rows
            .next()
            .map_err(|e| TabulaError::Statement(format!("Failed to fetch row: {}", e)))?
        {
            let mut values = Vec::with_capacity(column_names.len());
            for i in 0..column_names.len() {
                values.push(rusqlite_to_value(row, i)?);
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(row_count = rows.len(), execution_time_ms, "query executed");
        Ok(QueryResult {
            columns: column_names,
            rows,
            execution_time_ms,
        })
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        let conn = self.handle()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| TabulaError::Statement(format!("Failed to check table: {}", e)))?;
        Ok(count > 0)
    }

    fn begin(&mut self) -> Result<()> {
        self.handle()?
            .execute_batch("BEGIN DEFERRED")
            .map_err(|e| TabulaError::Statement(format!("Failed to begin transaction: {}", e)))
    }

    fn commit(&mut self) -> Result<()> {
        self.handle()?
            .execute_batch("COMMIT")
            .map_err(|e| TabulaError::Statement(format!("Failed to commit transaction: {}", e)))
    }

    fn rollback(&mut self) -> Result<()> {
        self.handle()?
            .execute_batch("ROLLBACK")
            .map_err(|e| TabulaError::Statement(format!("Failed to rollback transaction: {}", e)))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            tracing::debug!(path = %self.path, "closing SQLite connection");
            conn.close().map_err(|(_, e)| {
                TabulaError::Connection(format!("Failed to close SQLite connection: {}", e))
            })?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Int32(i) => rusqlite::types::Value::Integer(i64::from(*i)),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| TabulaError::Statement(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // Text stored without a declared type can come back as a blob
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let mut conn = SqliteConnection::open(":memory:", Duration::from_secs(1)).unwrap();
        conn.execute("CREATE TABLE t (id INTEGER, name TEXT)", &[])
            .unwrap();
        let inserted = conn
            .execute(
                "INSERT INTO t VALUES (?1, ?2)",
                &[Value::Int32(7), Value::String("seven".into())],
            )
            .unwrap();
        assert_eq!(inserted.affected_rows, 1);

        let result = conn
            .query("SELECT id, name FROM t WHERE id = ?1", &[Value::Int64(7)])
            .unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        let row = result.into_first_row().unwrap();
        assert_eq!(row.get_by_name("name"), Some(&Value::String("seven".into())));
    }

    #[test]
    fn table_exists_is_case_sensitive_on_stored_name() {
        let mut conn = SqliteConnection::open(":memory:", Duration::from_secs(1)).unwrap();
        conn.execute("CREATE TABLE \"cars\" (\"id\" INT)", &[]).unwrap();
        assert!(conn.table_exists("cars").unwrap());
        assert!(!conn.table_exists("trucks").unwrap());
    }

    #[test]
    fn closed_connection_rejects_calls() {
        let mut conn = SqliteConnection::open(":memory:", Duration::from_secs(1)).unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(conn.query("SELECT 1", &[]).is_err());
        conn.close().unwrap();
    }

    #[test]
    fn missing_parent_directory_is_a_connection_error() {
        let err = SqliteConnection::open("/definitely/not/here/db.sqlite", Duration::from_secs(1))
            .err()
            .unwrap();
        assert_eq!(err.kind(), tabula_core::ErrorKind::Connection);
    }

    #[test]
    fn placeholders_are_numbered_question_marks() {
        let conn = SqliteConnection::open(":memory:", Duration::from_secs(1)).unwrap();
        assert_eq!(conn.placeholder(2), "?2");
    }
}
