//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by object stores and edge caches.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend is not reachable or not bound.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// The key cannot be represented by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
