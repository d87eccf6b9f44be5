//! # framedex
//!
//! CSV bulk import/export engine for fighting-game reference data.
//!
//! Characters, move categories and moves live in a managed record store that
//! exposes list/create/delete/get with cursor-based pagination. framedex
//! reconciles CSV files against that store:
//!
//! - **Fetch**: whole collections are read by following continuation cursors
//! - **Reconcile**: either wipe the collection in bounded concurrent batches
//!   (replace-all) or index existing natural keys to skip duplicates
//! - **Import**: rows are validated, foreign keys resolved against the
//!   pre-run snapshot, and records created (or simulated in a dry run)
//!
//! ## Example
//!
//! ```rust,ignore
//! use framedex::io::{ImportOptions, ImportService};
//! use framedex::models::RecordKind;
//! use framedex::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let service = ImportService::new(Arc::new(MemoryStore::new()));
//! let result = service
//!     .import_from_file(
//!         "moves.csv".as_ref(),
//!         ImportOptions::for_kind(RecordKind::Move).with_dry_run(true),
//!         None,
//!     )
//!     .await?;
//! println!("{} ok, {} skipped, {} failed", result.success, result.skipped, result.error);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod store;

pub use config::FramedexConfig;
pub use models::{RecordFields, RecordId, RecordKind, StoredRecord};
pub use store::RecordStore;

/// Error type for framedex operations.
///
/// Every variant here is fatal for the run that raised it. Row-scoped
/// problems are reported through [`io::RowError`] and never surface as an
/// [`Error`].
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unknown record kind, empty CSV, bad cursor, bad config value |
/// | `OperationFailed` | File I/O, CSV parsing, log/metrics initialization |
/// | `Store` | A list/create/delete/get call against the record store failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A local operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The record store rejected or failed a call.
    #[error("store {operation} on {kind} failed: {cause}")]
    Store {
        /// Store operation (`list`, `create`, `delete`, `get`).
        operation: &'static str,
        /// Record kind the call targeted.
        kind: RecordKind,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Builds an [`Error::Store`] from any displayable cause.
    pub fn store(operation: &'static str, kind: RecordKind, cause: impl std::fmt::Display) -> Self {
        Self::Store {
            operation,
            kind,
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for framedex operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("read_csv", "unexpected EOF");
        assert_eq!(err.to_string(), "operation 'read_csv' failed: unexpected EOF");

        let err = Error::store("list", RecordKind::Move, "HTTP 503 response");
        assert_eq!(err.to_string(), "store list on move failed: HTTP 503 response");
    }
}
