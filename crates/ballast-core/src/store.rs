//! The store-construction seam.
//!
//! The synchronization engine never owns a reducer loop of its own; it builds
//! short-lived store instances through an injected [`StoreBuilder`] and talks
//! to them through the minimal [`StateStore`] surface. These traits are the
//! capability-typed rendition of the factory contract: there is nothing to
//! duck-type-check at runtime because an implementation either exists or the
//! program does not compile.

use std::sync::Arc;

use crate::error::BuildError;
use crate::reactive::{Listener, ListenerId};
use crate::reducer::Reducer;

/// The store surface the engine consumes.
///
/// Implementations are expected to notify subscribed listeners with the new
/// state whenever a dispatch changes it; notification may happen after
/// `dispatch` returns when the implementation applies actions asynchronously.
pub trait StateStore<S, A>: Send + Sync {
    /// Clone the current state.
    fn state(&self) -> S;

    /// Apply an action. Effects may be deferred by the implementation.
    fn dispatch(&self, action: A);

    /// Register a state-change listener.
    fn subscribe(&self, listener: Listener<S>) -> ListenerId;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// What a [`StoreBuilder`] is asked to construct from.
pub struct StoreRequest<S, A> {
    /// The reducer the store should apply.
    pub reducer: Arc<dyn Reducer<S, A>>,
    /// Preloaded state, or `None` to start from the reducer's defaults.
    pub preloaded_state: Option<S>,
    /// Optional wrapper applied around the built store.
    pub enhancer: Option<Arc<dyn StoreEnhancer<S, A>>>,
}

/// The injected store-construction factory.
///
/// A failure here is fatal to whichever engine call needed the construction;
/// the engine wraps it and never retries.
pub trait StoreBuilder<S, A>: Send + Sync {
    /// Construct a store instance for `request`.
    fn build(&self, request: StoreRequest<S, A>) -> Result<Arc<dyn StateStore<S, A>>, BuildError>;
}

/// Wraps a freshly built store with additional behavior.
///
/// The typed counterpart of a store enhancer: implementations receive the
/// inner store and return the store the engine will actually use, delegating
/// whatever they do not intercept.
pub trait StoreEnhancer<S, A>: Send + Sync {
    /// Wrap `inner`.
    fn enhance(&self, inner: Arc<dyn StateStore<S, A>>) -> Arc<dyn StateStore<S, A>>;
}
