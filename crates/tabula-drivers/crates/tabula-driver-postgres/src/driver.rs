//! PostgreSQL driver implementation

use std::time::Duration;
use tabula_core::{Connection, ConnectionConfig, DatabaseDriver, Result};

use crate::{PostgresConnectOptions, PostgresConnection};

const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }

    /// Resolve connection settings, falling back to local defaults
    pub fn connect_options(&self, config: &ConnectionConfig) -> PostgresConnectOptions {
        PostgresConnectOptions {
            host: config
                .get_string("host")
                .unwrap_or_else(|| "localhost".to_string()),
            port: if config.port > 0 {
                config.port
            } else {
                DEFAULT_PORT
            },
            database: config
                .get_string("database")
                .unwrap_or_else(|| "postgres".to_string()),
            user: config.get_string("user"),
            password: config.get_string("password"),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            statement_timeout: config.statement_timeout_ms.map(Duration::from_millis),
            application_name: config
                .get_string("application_name")
                .unwrap_or_else(|| "tabula".to_string()),
        }
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let options = self.connect_options(config);
        let conn = PostgresConnection::connect(&options)
            .inspect_err(|e| tracing::error!(error = %e, "failed to connect to PostgreSQL database"))?;
        Ok(Box::new(conn))
    }
}
