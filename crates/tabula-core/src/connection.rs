//! Connection trait and transaction handling

use crate::{QueryResult, Result, StatementResult, Value};

/// A blocking database connection.
///
/// Every call runs to completion on the calling thread. A connection is owned
/// by exactly one caller at a time, so mutating methods take `&mut self`.
pub trait Connection: Send {
    /// Get the driver name (e.g., "sqlite", "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data or schema (INSERT/CREATE/DROP)
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Render the bind placeholder for the 1-based parameter `index`.
    ///
    /// PostgreSQL uses `$1`, `$2`, ... which is the default.
    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    /// Check the catalog for a table with exactly this (stored) name
    fn table_exists(&mut self, table_name: &str) -> Result<bool>;

    /// Begin a transaction
    fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN", &[]).map(|_| ())
    }

    /// Commit the current transaction
    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT", &[]).map(|_| ())
    }

    /// Roll back the current transaction
    fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK", &[]).map(|_| ())
    }

    /// Close the connection
    fn close(&mut self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A transaction scoped to a borrowed connection.
///
/// Dropping the transaction without calling [`Transaction::commit`] or
/// [`Transaction::rollback`] rolls it back.
pub struct Transaction<'a> {
    conn: &'a mut dyn Connection,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Begin a transaction on `conn`
    pub fn begin(conn: &'a mut dyn Connection) -> Result<Self> {
        tracing::debug!(driver = conn.driver_name(), "beginning transaction");
        conn.begin()?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Execute a statement within the transaction
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.conn.execute(sql, params)
    }

    /// Execute a query within the transaction
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.conn.query(sql, params)
    }

    /// Placeholder syntax of the underlying connection
    pub fn placeholder(&self, index: usize) -> String {
        self.conn.placeholder(index)
    }

    /// Commit the transaction
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit()?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back the transaction
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback()?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("transaction dropped without commit or rollback, rolling back");
            if let Err(e) = self.conn.rollback() {
                tracing::error!(error = %e, "failed to roll back abandoned transaction");
            }
        }
    }
}
