//! Store error handling
//!
//! Typed errors for everything the store and codecs can fail on. The CLI
//! only ever distinguishes "success with result" from "failure with
//! message"; the variants exist so tests and future callers can match.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::Format;

/// Errors that can occur in the store or its codecs
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create the directory holding the database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Underlying SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database metadata rows are unreadable
    #[error("Database metadata is corrupt: {details}")]
    CorruptMeta { details: String },

    /// The format is valid but not for the requested direction
    #[error("{format} is not supported for import")]
    UnsupportedImport { format: Format },

    /// Input bytes do not parse as the requested format
    #[error("Malformed {format} input: {details}")]
    Decode { format: Format, details: String },

    /// A URL or tag contains a delimiter the text format reserves
    #[error("Cannot encode {value:?}: tabs and newlines are reserved")]
    Unencodable { value: String },

    /// An empty URL was given to a mutating operation
    #[error("URL must not be empty")]
    EmptyUrl,

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_import_display() {
        let err = StoreError::UnsupportedImport {
            format: Format::Html,
        };
        assert_eq!(err.to_string(), "html is not supported for import");
    }

    #[test]
    fn test_decode_display() {
        let err = StoreError::Decode {
            format: Format::Json,
            details: "expected object or array".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("json"));
        assert!(msg.contains("expected object or array"));
    }

    #[test]
    fn test_database_conversion() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
