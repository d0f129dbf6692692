//! bmark Core Library
//!
//! This crate provides the core functionality for bmark, a command-line
//! browser-independent bookmark manager: URLs associated with tags in a
//! local SQLite database.
//!
//! # Architecture
//!
//! - **Store**: owns the database and all mutation; every operation is
//!   one transaction
//! - **Lifecycle**: soft-delete via enable/disable stamp pairs and a
//!   pure activeness predicate
//! - **Codecs**: text/JSON/CBOR interchange plus write-only HTML
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! store.add("https://example.com", &["reading".to_string()])?;
//!
//! // URLs carrying every queried tag
//! let listing = store.list(&["reading".to_string()], true)?;
//! ```
//!
//! # Modules
//!
//! - `store`: the bookmark store (main entry point)
//! - `models`: lifecycle stamps and query result shapes
//! - `codec`: interchange format encoding/decoding
//! - `storage`: SQLite schema and error taxonomy
//! - `config`: application configuration

pub mod codec;
pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use codec::Format;
pub use config::Config;
pub use models::{Lifecycle, Listing, Stamp, TagSummary, SET_PREFIX};
pub use storage::{StoreError, StoreResult};
pub use store::Store;
