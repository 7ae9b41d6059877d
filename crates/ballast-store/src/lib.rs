//! Ballast synchronization engine.
//!
//! Keeps a reducer-driven state container durably mirrored in a storage
//! backend, across process restarts and across concurrent consumers of that
//! backend. Initialization merges persisted state over the reducer's
//! defaults; bursts of dispatches coalesce into one persisted write through
//! a short-lived buffer; changes made by other writers flow back into the
//! in-memory snapshot, with equality checks suppressing echoes of this
//! process's own writes.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ballast_core::FnReducer;
//! use ballast_storage::FileBackend;
//! use ballast_store::{BasicStoreBuilder, MirrorConfig, StoreMirror};
//!
//! let config = MirrorConfig::new(
//!     Arc::new(BasicStoreBuilder),
//!     Arc::new(FnReducer::new(|state: &u64, action: &u64| state + action)),
//!     Arc::new(FileBackend::new("state.json")),
//! );
//! let mirror = StoreMirror::new(config);
//! let store = mirror.init().await?;
//!
//! store.dispatch(5)?;
//! let _ = store.subscribe(|| println!("state changed"));
//! ```

mod buffer;

pub mod basic;
pub mod config;
pub mod engine;
pub mod error;

pub use basic::{BasicStore, BasicStoreBuilder};
pub use config::{MirrorConfig, DEFAULT_BUFFER_LIFE, MAX_BUFFER_LIFE};
pub use engine::{MirroredState, StoreMirror, SyncedStore};
pub use error::{Result, StoreError};
