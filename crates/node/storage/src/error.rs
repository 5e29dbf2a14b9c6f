use std::time::Duration;
use thiserror::Error;

/// Errors that may occur while interacting with the explorer store.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The expected entry was not found in the store.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Represents a conflict occurred while attempting to write to the store.
    #[error("Conflict error: {0}")]
    ConflictError(String),

    /// The backing store failed to serve the request.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The store did not answer within the configured timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}
