//! Core vocabulary for Ballast.
//!
//! This crate holds the pure building blocks the synchronization engine is
//! assembled from: the recursive merge over JSON value trees, the capability
//! traits at the store-construction seam ([`Reducer`], [`StateStore`],
//! [`StoreBuilder`], [`StoreEnhancer`]), and small reactive primitives
//! ([`Snapshot`], [`ListenerSet`], [`StateObserver`]). It contains no I/O and
//! no runtime dependencies; implementations live in the higher crates.

pub mod error;
pub mod merge;
pub mod reactive;
pub mod reducer;
pub mod store;

pub use error::BuildError;
pub use merge::merge_or_replace;
pub use reactive::{Listener, ListenerId, ListenerSet, Snapshot, StateObserver, Unsubscribe};
pub use reducer::{FnReducer, Reducer};
pub use store::{StateStore, StoreBuilder, StoreEnhancer, StoreRequest};
