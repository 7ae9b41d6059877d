//! Engine configuration.

use std::sync::Arc;
use std::time::Duration;

use ballast_core::{Reducer, StoreBuilder, StoreEnhancer};
use ballast_storage::StorageBackend;

/// How long a write buffer remains the coalescing target when the caller
/// does not say otherwise.
pub const DEFAULT_BUFFER_LIFE: Duration = Duration::from_millis(100);

/// Upper clamp for the configured buffer lifetime. The lower bound of zero
/// is `Duration`'s own.
pub const MAX_BUFFER_LIFE: Duration = Duration::from_millis(2000);

/// Configuration for a [`StoreMirror`](crate::StoreMirror).
///
/// The three collaborators every engine needs (store factory, reducer,
/// storage backend) are constructor parameters, so a configuration missing
/// one of them does not exist at runtime.
pub struct MirrorConfig<S, A> {
    pub(crate) builder: Arc<dyn StoreBuilder<S, A>>,
    pub(crate) reducer: Arc<dyn Reducer<S, A>>,
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) buffer_life: Duration,
    pub(crate) initial_state: Option<S>,
    pub(crate) enhancer: Option<Arc<dyn StoreEnhancer<S, A>>>,
}

impl<S, A> MirrorConfig<S, A> {
    /// Configure an engine from its required collaborators.
    pub fn new(
        builder: Arc<dyn StoreBuilder<S, A>>,
        reducer: Arc<dyn Reducer<S, A>>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            builder,
            reducer,
            storage,
            buffer_life: DEFAULT_BUFFER_LIFE,
            initial_state: None,
            enhancer: None,
        }
    }

    /// Set the write-buffer lifetime, clamped to [`MAX_BUFFER_LIFE`].
    pub fn with_buffer_life(mut self, life: Duration) -> Self {
        self.buffer_life = life.min(MAX_BUFFER_LIFE);
        self
    }

    /// Supply an initial-state override merged over persisted state during
    /// initialization.
    pub fn with_initial_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Wrap every store the engine constructs with `enhancer`.
    pub fn with_enhancer(mut self, enhancer: Arc<dyn StoreEnhancer<S, A>>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// The effective (clamped) buffer lifetime.
    pub fn buffer_life(&self) -> Duration {
        self.buffer_life
    }
}
