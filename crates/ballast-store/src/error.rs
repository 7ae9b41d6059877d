//! Error types for the synchronization engine.

use thiserror::Error;

use ballast_core::BuildError;
use ballast_storage::StorageError;

/// Failures the synchronization engine can surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The injected store factory failed. Fatal to the call that needed the
    /// construction; never retried.
    #[error("store construction failed: {0}")]
    Construction(#[from] BuildError),

    /// A storage operation failed. Surfaced at the point of the failed
    /// read or write; writes are never retried and the in-memory state is
    /// unaffected.
    #[error("state persistence failed: {0}")]
    Persistence(#[from] StorageError),

    /// State could not be converted to or from its persisted JSON form.
    #[error("state codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, StoreError>;
