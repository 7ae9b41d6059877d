//! Error types for storage backends.

use thiserror::Error;

/// Failures a storage backend can report.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Reading the persisted document failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Writing the document failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The backend refused the write for capacity reasons.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The persisted document exists but is not valid JSON.
    #[error("malformed stored data: {0}")]
    Malformed(String),
}

impl StorageError {
    /// Create a read failure.
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed(message.into())
    }

    /// Create a write failure.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed(message.into())
    }

    /// Create a quota failure.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded(message.into())
    }

    /// Create a malformed-data failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
