//! Database module.
//!
//! Provides SQLite storage with automatic migrations for alerts,
//! uptime records and the tenant directory.

mod models;
mod store;

pub use models::*;
pub use store::*;
