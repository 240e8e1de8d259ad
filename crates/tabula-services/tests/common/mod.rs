//! Common test utilities and mocks

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tabula_core::{
    Connection, ConnectionConfig, DatabaseDriver, QueryResult, Result, Row, StatementResult,
    TabulaError, Value,
};

/// State shared between a [`MockDriver`] and every connection it hands out
#[derive(Default)]
pub struct MockState {
    pub connect_count: usize,
    pub close_count: usize,
    /// Connect attempts still to fail before one succeeds
    pub failing_connects: usize,
    pub existing_tables: HashSet<String>,
    /// SQL fragments whose execution fails
    pub fail_on: Vec<String>,
    /// SQL-pattern-based responses for queries
    pub query_responses: Vec<(String, QueryResult)>,
    /// Log of all SQL executed or queried, for assertion in tests
    pub sql_log: Vec<String>,
    pub params_log: Vec<Vec<Value>>,
}

/// Driver that counts connects and hands out [`MockConnection`]s.
///
/// Connections use `$n` placeholders and answer `table_exists` from
/// `existing_tables`, which `CREATE`/`DROP` statements keep up to date.
#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str) -> Self {
        self.state.lock().existing_tables.insert(table.to_string());
        self
    }

    pub fn failing_connects(self, attempts: usize) -> Self {
        self.state.lock().failing_connects = attempts;
        self
    }

    pub fn fail_on(self, sql_contains: &str) -> Self {
        self.state.lock().fail_on.push(sql_contains.to_string());
        self
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(self, sql_contains: &str, result: QueryResult) -> Self {
        self.state
            .lock()
            .query_responses
            .push((sql_contains.to_string(), result));
        self
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connect_count
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    pub fn sql_log(&self) -> Vec<String> {
        self.state.lock().sql_log.clone()
    }

    pub fn params_log(&self) -> Vec<Vec<Value>> {
        self.state.lock().params_log.clone()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state.lock().existing_tables.contains(table)
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.sql_log.clear();
        state.params_log.clear();
    }

    pub fn into_arc(self) -> Arc<dyn DatabaseDriver> {
        Arc::new(self)
    }
}

impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock();
        state.connect_count += 1;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(TabulaError::Connection("connection refused".into()));
        }
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockConnection {
    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        let mut state = self.state.lock();
        state.sql_log.push(sql.to_string());
        state.params_log.push(params.to_vec());
        if state.fail_on.iter().any(|pattern| sql.contains(pattern.as_str())) {
            return Err(TabulaError::Statement(format!("mock failure: {}", sql)));
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.record(sql, params)?;

        let mut state = self.state.lock();
        if let Some(table) = quoted_name_after(sql, "CREATE TABLE IF NOT EXISTS ") {
            state.existing_tables.insert(table);
        } else if let Some(table) = quoted_name_after(sql, "DROP TABLE IF EXISTS ") {
            state.existing_tables.remove(&table);
        }
        Ok(StatementResult { affected_rows: 1 })
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.record(sql, params)?;

        let state = self.state.lock();
        for (pattern, result) in &state.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }

    fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        self.record("TABLE_EXISTS", &[Value::from(table_name)])?;
        Ok(self.state.lock().existing_tables.contains(table_name))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.state.lock().close_count += 1;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Name inside the leading double-quoted identifier following `prefix`
fn quoted_name_after(sql: &str, prefix: &str) -> Option<String> {
    let rest = sql.strip_prefix(prefix)?.strip_prefix('"')?;
    let mut name = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                name.push('"');
            } else {
                return Some(name);
            }
        } else {
            name.push(c);
        }
    }
    None
}

/// Helper to create a QueryResult from column names and rows
pub fn mock_query_result(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> QueryResult {
    let columns: Vec<String> = columns.into_iter().map(String::from).collect();
    QueryResult {
        rows: rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect(),
        columns,
        execution_time_ms: 0,
    }
}
