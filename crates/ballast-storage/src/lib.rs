//! Storage adapter boundary for Ballast.
//!
//! [`StorageBackend`] is the uniform asynchronous facade the synchronization
//! engine consumes: load the whole persisted document, save a replacement,
//! and observe every change, the backend's own writes included. Two thin
//! implementations ship with the crate: [`MemoryBackend`] (shared-handle,
//! for tests and multi-consumer setups) and [`FileBackend`] (one JSON
//! document on disk).

pub mod backend;
pub mod error;
pub mod filesystem;
pub mod memory;

pub use backend::StorageBackend;
pub use error::{Result, StorageError};
pub use filesystem::FileBackend;
pub use memory::MemoryBackend;
