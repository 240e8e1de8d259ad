//! Database driver trait and connection configuration

use crate::{Connection, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Factory for connections to one kind of database
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres", "sqlite")
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Open a new connection
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;

    /// Open a connection, run a trivial query and close it again
    fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!(driver = self.name(), "testing connection");
        let mut conn = self.connect(config)?;
        conn.query("SELECT 1", &[])?;
        conn.close()
    }
}

/// Parameters needed to open a connection.
///
/// Defaults describe a local PostgreSQL server with the stock `postgres`
/// database and user.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "postgres", "sqlite")
    pub driver: String,
    /// Host address (ignored by file-based databases)
    pub host: String,
    /// Port number (0 selects the driver default)
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Database file for file-based drivers
    pub path: Option<PathBuf>,
    /// Upper bound on connection establishment, in seconds
    pub connect_timeout_secs: u64,
    /// Per-statement timeout applied to the session, in milliseconds
    pub statement_timeout_ms: Option<u64>,
    /// Additional driver-specific parameters
    pub params: HashMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: Some("postgres".to_string()),
            password: None,
            path: None,
            connect_timeout_secs: 10,
            statement_timeout_ms: None,
            params: HashMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration for a SQLite database file
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            driver: "sqlite".to_string(),
            host: String::new(),
            port: 0,
            database: String::new(),
            username: None,
            password: None,
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Look up a value by key, checking `params` before the typed fields
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(value) = self.params.get(key) {
            return Some(value.clone());
        }
        match key {
            "host" if !self.host.is_empty() => Some(self.host.clone()),
            "database" if !self.database.is_empty() => Some(self.database.clone()),
            "user" | "username" => self.username.clone(),
            "password" => self.password.clone(),
            "path" => self.path.as_ref().map(|p| p.display().to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("path", &self.path)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("statement_timeout_ms", &self.statement_timeout_ms)
            .field("params", &self.params)
            .finish()
    }
}
