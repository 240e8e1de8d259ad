//! Tabula Core - shared abstractions for loading tabular files into SQL databases
//!
//! This crate provides the types and traits every other Tabula crate
//! depends on:
//!
//! - `DatabaseDriver` - Factory trait that opens connections from a `ConnectionConfig`
//! - `Connection` - Blocking database connection with transaction control
//! - Common types like `Value`, `Row`, `QueryResult`
//! - `TabulaError` - The error taxonomy shared by drivers and services

mod connection;
mod driver;
mod error;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
