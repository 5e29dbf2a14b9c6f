use crate::BufferClientError;
use opera_storage::StorageError;
use thiserror::Error;

/// The error type for the [`crate::BlockObserverActor`].
#[derive(Error, Debug)]
pub enum ObserverError {
    /// The buffer actor is gone.
    #[error("buffer unavailable: {0}")]
    Buffer(#[from] BufferClientError),
    /// A store call failed.
    #[error("store call `{op}` failed: {source}")]
    Store {
        /// The failed operation.
        op: &'static str,
        /// The store error.
        #[source]
        source: StorageError,
    },
}
