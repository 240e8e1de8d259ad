//! Tabula Services Layer
//!
//! Sits between the command-line front end and the drivers.
//!
//! # Architecture
//!
//! ```text
//! CLI (tabula-cli)
//!     ↓
//! Service Layer (tabula-services) ← This crate
//!     ↓
//! Schema inference (tabula-interchange)
//!     ↓
//! Infrastructure (tabula-core, tabula-drivers)
//! ```
//!
//! # Services
//!
//! - [`TableManager`] - Table existence, creation, bulk insert, drop and point lookups
//! - [`equality_lookup_sql`] - Guarded single-column equality query builder

mod lookup;
mod table_manager;

pub use lookup::equality_lookup_sql;
pub use table_manager::{ErrorPolicy, InsertReport, TableManager, TableManagerConfig};
