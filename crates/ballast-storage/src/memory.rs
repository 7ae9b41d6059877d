//! In-memory storage backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::RwLock;

use crate::backend::StorageBackend;
use crate::error::{Result, StorageError};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Shared-slot in-memory backend.
///
/// Cloning shares the underlying document and change channel, so several
/// consumers cloned from one `MemoryBackend` behave like concurrent writers
/// to one storage area. An optional byte capacity makes the backend refuse
/// oversized documents the way a quota-limited native store would.
#[derive(Clone)]
pub struct MemoryBackend {
    slot: Arc<RwLock<Option<Value>>>,
    changes: broadcast::Sender<Value>,
    capacity: Option<usize>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Create an empty backend with no capacity limit.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            slot: Arc::new(RwLock::new(None)),
            changes,
            capacity: None,
            loads: Arc::new(AtomicUsize::new(0)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a backend that rejects documents larger than `bytes` when
    /// serialized.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::new()
        }
    }

    /// Seed the document without emitting a change event, as if it had been
    /// persisted by an earlier process run.
    pub async fn seed(&self, value: Value) {
        *self.slot.write().await = Some(value);
    }

    /// Number of `load` calls served. Diagnostic counter.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of successful `save` calls. Diagnostic counter.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Clone the current document, if any.
    pub async fn contents(&self) -> Option<Value> {
        self.slot.read().await.clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Value>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, value: &Value) -> Result<()> {
        if let Some(capacity) = self.capacity {
            let size = serde_json::to_vec(value)
                .map_err(|e| StorageError::write_failed(e.to_string()))?
                .len();
            if size > capacity {
                return Err(StorageError::quota_exceeded(format!(
                    "{size} bytes exceeds capacity of {capacity}"
                )));
            }
        }
        *self.slot.write().await = Some(value.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        // nobody listening is fine
        let _ = self.changes.send(value.clone());
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Value> {
        self.changes.subscribe()
    }
}
