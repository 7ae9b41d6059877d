//! Filesystem storage backend.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::{Result, StorageError};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// One JSON document at a configured path.
///
/// `init` creates the parent directory; a missing file loads as `None`.
/// Change notification covers writers that share this instance (clones share
/// the channel); watching the file for foreign processes is a concern for a
/// heavier backend.
#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    changes: broadcast::Sender<Value>,
}

impl FileBackend {
    /// Create a backend persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            changes,
        }
    }

    /// The document path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::write_failed(format!("create directory: {e}")))?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<Option<Value>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::read_failed(e.to_string())),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        Ok(Some(value))
    }

    async fn save(&self, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::write_failed(e.to_string()))?;
        fs::write(&self.path, bytes).await.map_err(|e| {
            // ENOSPC is the filesystem's quota signal
            if e.raw_os_error() == Some(28) {
                StorageError::quota_exceeded(e.to_string())
            } else {
                StorageError::write_failed(e.to_string())
            }
        })?;
        debug!(path = %self.path.display(), "state document persisted");
        let _ = self.changes.send(value.clone());
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Value> {
        self.changes.subscribe()
    }
}
