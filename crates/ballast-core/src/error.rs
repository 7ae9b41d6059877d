//! Errors raised at the store-construction seam.

use thiserror::Error;

/// Error raised by a [`StoreBuilder`](crate::store::StoreBuilder) when it
/// cannot produce a store instance.
///
/// The engine treats this as fatal to whichever call needed the construction:
/// there is no retry.
#[derive(Debug, Clone, Error)]
#[error("store construction failed: {message}")]
pub struct BuildError {
    message: String,
}

impl BuildError {
    /// Create a construction error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
