//! SQLite driver implementation

use std::time::Duration;
use tabula_core::{Connection, ConnectionConfig, DatabaseDriver, Result, TabulaError};

use crate::SqliteConnection;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").or_else(|| config.get_string("database")).as_deref()))]
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let path = config
            .get_string("path")
            .or_else(|| config.get_string("database"))
            .ok_or_else(|| {
                TabulaError::Configuration(
                    "SQLite requires a 'path' or 'database' setting, e.g. path = \"/data/cars.db\""
                        .into(),
                )
            })?;

        let busy_timeout_ms = match config.get_string("busy_timeout_ms") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                TabulaError::Configuration(format!("Invalid busy_timeout_ms: {}", raw))
            })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        let conn = SqliteConnection::open(&path, Duration::from_millis(busy_timeout_ms))
            .inspect_err(|e| tracing::error!(error = %e, "failed to connect to SQLite database"))?;

        tracing::debug!(path = %conn.path(), "SQLite connection created");
        Ok(Box::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_a_configuration_error() {
        let config = ConnectionConfig {
            driver: "sqlite".into(),
            database: String::new(),
            ..Default::default()
        };
        let err = SqliteDriver::new().connect(&config).err().unwrap();
        assert_eq!(err.kind(), tabula_core::ErrorKind::Configuration);
    }

    #[test]
    fn invalid_busy_timeout_is_rejected() {
        let mut config = ConnectionConfig::sqlite(":memory:");
        config.params.insert("busy_timeout_ms".into(), "soon".into());
        let err = SqliteDriver::new().connect(&config).err().unwrap();
        assert!(err.to_string().contains("busy_timeout_ms"));
    }

    #[test]
    fn test_connection_succeeds_in_memory() {
        let config = ConnectionConfig::sqlite(":memory:");
        SqliteDriver::new().test_connection(&config).unwrap();
    }
}
