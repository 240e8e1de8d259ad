//! Table lifecycle management over a single reconnecting connection

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula_core::{Connection, ConnectionConfig, DatabaseDriver, Result, Row, Transaction, Value};
use tabula_interchange::{
    Dataset, IdentifierKind, TableSchema, extract_names, infer_schema, quote_identifier,
    validate_identifier,
};

use crate::lookup::equality_lookup_sql;

/// What happens to connection and statement failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure and report `false`, `None` or `()` instead
    #[default]
    LogAndContinue,
    /// Return the failure to the caller
    Propagate,
}

/// Table manager settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableManagerConfig {
    pub error_policy: ErrorPolicy,
}

/// Outcome of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Rows committed; zero when the batch was rolled back
    pub rows_inserted: u64,
    /// Whether the table was created for this insert
    pub created_table: bool,
}

enum ConnectionState {
    Disconnected,
    Connected(Box<dyn Connection>),
}

/// Live connection borrowed for one operation; closed when dropped
struct ConnectionGuard<'a> {
    state: &'a mut ConnectionState,
}

impl ConnectionGuard<'_> {
    fn conn(&mut self) -> &mut dyn Connection {
        match self.state {
            ConnectionState::Connected(conn) => conn.as_mut(),
            ConnectionState::Disconnected => {
                unreachable!("guard is only created over a connected state")
            }
        }
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        release(self.state);
    }
}

fn release(state: &mut ConnectionState) {
    if let ConnectionState::Connected(mut conn) =
        std::mem::replace(state, ConnectionState::Disconnected)
    {
        tracing::debug!(driver = conn.driver_name(), "releasing connection");
        if let Err(e) = conn.close() {
            tracing::warn!(error = %e, "failed to close connection");
        }
    }
}

/// Runs `work` inside a transaction, committing on success and rolling back on failure
fn in_transaction<T>(
    conn: &mut dyn Connection,
    work: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let mut tx = Transaction::begin(conn)?;
    match work(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = tx.rollback() {
                tracing::error!(error = %rollback_error, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Creates, fills, queries and drops tables through one owned connection.
///
/// The connection is opened for each operation and closed again when the
/// operation returns, whatever the outcome. Table and column names are
/// checked against the reserved keywords before any connection is opened.
///
/// Each operation comes in two forms. `try_*` always returns failures.
/// The plain form applies the configured [`ErrorPolicy`]; validation errors
/// are returned under every policy.
pub struct TableManager {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    settings: TableManagerConfig,
    state: ConnectionState,
}

impl TableManager {
    /// Create a manager with the default (log and continue) policy
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self::with_config(driver, config, TableManagerConfig::default())
    }

    /// Create a manager and try to connect straight away.
    ///
    /// A failed connect is logged; the next operation tries again.
    pub fn with_config(
        driver: Arc<dyn DatabaseDriver>,
        config: ConnectionConfig,
        settings: TableManagerConfig,
    ) -> Self {
        let mut manager = Self {
            driver,
            config,
            settings,
            state: ConnectionState::Disconnected,
        };
        if let Err(e) = manager.connect() {
            tracing::warn!(error = %e, "initial connection failed");
        }
        manager
    }

    pub fn settings(&self) -> &TableManagerConfig {
        &self.settings
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Whether a live handle is currently held
    pub fn is_connected(&self) -> bool {
        match &self.state {
            ConnectionState::Connected(conn) => !conn.is_closed(),
            ConnectionState::Disconnected => false,
        }
    }

    /// Release the handle, if any
    pub fn close(&mut self) {
        release(&mut self.state);
    }

    fn connect(&mut self) -> Result<()> {
        if let ConnectionState::Connected(conn) = &self.state
            && !conn.is_closed()
        {
            return Ok(());
        }
        let conn = self.driver.connect(&self.config)?;
        tracing::info!(driver = self.driver.name(), "connected");
        self.state = ConnectionState::Connected(conn);
        Ok(())
    }

    fn acquire(&mut self) -> Result<ConnectionGuard<'_>> {
        self.connect()?;
        Ok(ConnectionGuard {
            state: &mut self.state,
        })
    }

    fn apply_policy<T>(
        &self,
        operation: &'static str,
        result: Result<T>,
        fallback: T,
    ) -> Result<T> {
        match result {
            Err(e)
                if !e.is_validation()
                    && self.settings.error_policy == ErrorPolicy::LogAndContinue =>
            {
                tracing::warn!(operation, error = %e, "operation failed");
                Ok(fallback)
            }
            other => other,
        }
    }

    /// Whether `table` exists; failures read as `false` under the lenient policy
    pub fn exists(&mut self, table: &str) -> Result<bool> {
        let result = self.try_exists(table);
        self.apply_policy("exists", result, false)
    }

    pub fn try_exists(&mut self, table: &str) -> Result<bool> {
        validate_identifier(IdentifierKind::Table, table)?;
        let mut guard = self.acquire()?;
        let exists = guard.conn().table_exists(table)?;
        tracing::debug!(table, exists, "checked table");
        Ok(exists)
    }

    /// Create `table` if it does not exist yet
    pub fn create(&mut self, table: &str, schema: &TableSchema) -> Result<()> {
        let result = self.try_create(table, schema);
        self.apply_policy("create", result, ())
    }

    pub fn try_create(&mut self, table: &str, schema: &TableSchema) -> Result<()> {
        validate_table_and_columns(table, &schema.column_names())?;
        let mut guard = self.acquire()?;
        create_table(guard.conn(), table, schema)
    }

    /// Insert every dataset row, creating the table from the inferred schema if needed
    pub fn bulk_insert(&mut self, table: &str, dataset: &Dataset) -> Result<()> {
        self.bulk_insert_report(table, dataset).map(|_| ())
    }

    /// Like [`TableManager::bulk_insert`], reporting what was done
    pub fn bulk_insert_report(&mut self, table: &str, dataset: &Dataset) -> Result<InsertReport> {
        let result = self.try_bulk_insert(table, dataset);
        self.apply_policy("bulk_insert", result, InsertReport::default())
    }

    pub fn try_bulk_insert(&mut self, table: &str, dataset: &Dataset) -> Result<InsertReport> {
        validate_table_and_columns(table, &dataset.column_names())?;
        let schema = infer_schema(dataset);
        if schema.is_empty() {
            tracing::debug!(table, "dataset has no columns, nothing to insert");
            return Ok(InsertReport::default());
        }
        let mut guard = self.acquire()?;
        let conn = guard.conn();

        let exists = conn.table_exists(table).unwrap_or_else(|e| {
            tracing::warn!(table, error = %e, "table check failed, treating table as missing");
            false
        });
        let created_table = !exists;
        if created_table {
            create_table(conn, table, &schema)?;
        }

        if dataset.is_empty() {
            return Ok(InsertReport {
                rows_inserted: 0,
                created_table,
            });
        }

        let columns = extract_names(&schema.column_definitions_sql());
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            (1..=columns.len())
                .map(|i| conn.placeholder(i))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let rows_inserted = in_transaction(conn, |tx| {
            let mut inserted = 0u64;
            for index in 0..dataset.row_count() {
                let params: Vec<Value> = dataset
                    .columns()
                    .iter()
                    .zip(schema.columns())
                    .map(|(column, definition)| column.cell(index, definition.column_type))
                    .collect();
                tx.execute(&sql, &params)?;
                inserted += 1;
            }
            Ok(inserted)
        })?;

        tracing::info!(table, rows = rows_inserted, created_table, "bulk insert committed");
        Ok(InsertReport {
            rows_inserted,
            created_table,
        })
    }

    /// Drop `table` if it exists
    pub fn drop(&mut self, table: &str) -> Result<()> {
        let result = self.try_drop(table);
        self.apply_policy("drop", result, ())
    }

    pub fn try_drop(&mut self, table: &str) -> Result<()> {
        validate_identifier(IdentifierKind::Table, table)?;
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
        let mut guard = self.acquire()?;
        in_transaction(guard.conn(), |tx| tx.execute(&sql, &[]).map(|_| ()))?;
        tracing::info!(table, "dropped table");
        Ok(())
    }

    /// First row whose `id` column equals `id`
    pub fn fetch_by_id(&mut self, table: &str, id: i64) -> Result<Option<Row>> {
        let result = self.try_fetch_by_id(table, id);
        self.apply_policy("fetch_by_id", result, None)
    }

    pub fn try_fetch_by_id(&mut self, table: &str, id: i64) -> Result<Option<Row>> {
        validate_identifier(IdentifierKind::Table, table)?;
        let mut guard = self.acquire()?;
        let conn = guard.conn();
        let sql = format!(
            "SELECT * FROM {} WHERE \"id\" = {}",
            quote_identifier(table),
            conn.placeholder(1)
        );
        Ok(conn.query(&sql, &[Value::Int64(id)])?.into_first_row())
    }

    /// Run a caller-built parameterized query and return its first row.
    ///
    /// The SQL text is passed through as is.
    pub fn run_query(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let result = self.try_run_query(sql, params);
        self.apply_policy("run_query", result, None)
    }

    pub fn try_run_query(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut guard = self.acquire()?;
        Ok(guard.conn().query(sql, params)?.into_first_row())
    }

    /// First row of `table` whose `column` equals `value`
    pub fn lookup(&mut self, table: &str, column: &str, value: Value) -> Result<Option<Row>> {
        let result = self.try_lookup(table, column, value);
        self.apply_policy("lookup", result, None)
    }

    pub fn try_lookup(&mut self, table: &str, column: &str, value: Value) -> Result<Option<Row>> {
        validate_identifier(IdentifierKind::Table, table)?;
        validate_identifier(IdentifierKind::Column, column)?;
        let mut guard = self.acquire()?;
        let conn = guard.conn();
        let sql = equality_lookup_sql(conn, table, column)?;
        Ok(conn.query(&sql, &[value])?.into_first_row())
    }
}

impl Drop for TableManager {
    fn drop(&mut self) {
        release(&mut self.state);
    }
}

fn validate_table_and_columns(table: &str, columns: &[String]) -> Result<()> {
    validate_identifier(IdentifierKind::Table, table)?;
    columns
        .iter()
        .try_for_each(|column| validate_identifier(IdentifierKind::Column, column))
}

fn create_table(conn: &mut dyn Connection, table: &str, schema: &TableSchema) -> Result<()> {
    let sql = schema.create_table_sql(table);
    in_transaction(conn, |tx| tx.execute(&sql, &[]).map(|_| ()))?;
    tracing::info!(table, columns = schema.len(), "created table");
    Ok(())
}
