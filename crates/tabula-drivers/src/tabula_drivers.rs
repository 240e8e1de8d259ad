//! Tabula Drivers - database driver implementations
//!
//! Each driver lives in its own crate and is pulled in through a cargo
//! feature. [`DriverRegistry`] maps driver names to instances.

#[cfg(feature = "postgres")]
pub use tabula_driver_postgres as postgres;
#[cfg(feature = "sqlite")]
pub use tabula_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

pub use tabula_core::{
    Connection, ConnectionConfig, DatabaseDriver, QueryResult, Result, Row, StatementResult,
    TabulaError, Transaction, Value,
};
