//! Storage layer
//!
//! SQLite schema management and the typed error taxonomy. The store
//! itself lives in `crate::store`; everything here is backend plumbing.

pub mod error;
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
