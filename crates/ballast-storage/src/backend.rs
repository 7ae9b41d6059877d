//! The storage backend facade.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

/// Uniform asynchronous facade over an underlying key-value storage API.
///
/// A backend persists one whole JSON document. Callback- or promise-shaped
/// native APIs are normalized behind these async methods by the
/// implementation.
///
/// # Change notification contract
///
/// [`changes`](StorageBackend::changes) must yield the new document after
/// **every** successful save by **any** writer, this process's own saves
/// included. The synchronization engine relies on that echo: its own writes
/// come back through the change stream and are absorbed by equality checks,
/// while foreign writes propagate into memory. A backend that suppresses its
/// own echoes would leave the engine's snapshot stale after each dispatch.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Prepare the backend for use. The default implementation does nothing.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Load the currently persisted document, or `None` if nothing has been
    /// persisted yet.
    async fn load(&self) -> Result<Option<Value>>;

    /// Persist `value` as the whole document, replacing what was there.
    ///
    /// Capacity failures are reported as
    /// [`StorageError::QuotaExceeded`](crate::StorageError::QuotaExceeded).
    async fn save(&self, value: &Value) -> Result<()>;

    /// Subscribe to document changes.
    ///
    /// Receivers that fall behind observe a lagged error and continue with
    /// the latest values; last-writer-wins convergence tolerates the skip.
    fn changes(&self) -> broadcast::Receiver<Value>;
}
