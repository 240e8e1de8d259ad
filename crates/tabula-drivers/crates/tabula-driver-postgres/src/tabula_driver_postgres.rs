//! PostgreSQL database driver implementation
//!
//! Connections are blocking: each call is driven to completion on a private
//! Tokio runtime owned by this crate.

mod connection;
mod driver;

pub use connection::{PostgresConnectOptions, PostgresConnection};
pub use driver::PostgresDriver;
