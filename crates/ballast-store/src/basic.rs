//! A plain synchronous reducer store and its factory.
//!
//! The engine is designed around an injected store factory; this module is
//! the in-tree default so the crate is usable without one. `BasicStore`
//! applies the reducer synchronously and notifies listeners on every
//! dispatch; the equality filtering that decides whether anything is
//! persisted lives in the engine, not here.

use std::sync::Arc;

use ballast_core::{
    BuildError, Listener, ListenerId, ListenerSet, Reducer, StateStore, StoreBuilder, StoreRequest,
};
use parking_lot::RwLock;

/// Synchronous reducer store.
pub struct BasicStore<S, A> {
    reducer: Arc<dyn Reducer<S, A>>,
    state: RwLock<S>,
    listeners: ListenerSet<S>,
}

impl<S, A> BasicStore<S, A> {
    /// Create a store over `reducer` starting from `initial`.
    pub fn new(reducer: Arc<dyn Reducer<S, A>>, initial: S) -> Self {
        Self {
            reducer,
            state: RwLock::new(initial),
            listeners: ListenerSet::new(),
        }
    }
}

impl<S, A> StateStore<S, A> for BasicStore<S, A>
where
    S: Clone + Send + Sync,
    A: Send,
{
    fn state(&self) -> S {
        self.state.read().clone()
    }

    fn dispatch(&self, action: A) {
        let next = {
            let current = self.state.read();
            self.reducer.reduce(&current, &action)
        };
        *self.state.write() = next.clone();
        self.listeners.notify(&next);
    }

    fn subscribe(&self, listener: Listener<S>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// The default [`StoreBuilder`]: preloaded state when given, otherwise the
/// reducer's own defaults, with the enhancer applied around the result.
pub struct BasicStoreBuilder;

impl<S, A> StoreBuilder<S, A> for BasicStoreBuilder
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    fn build(&self, request: StoreRequest<S, A>) -> Result<Arc<dyn StateStore<S, A>>, BuildError> {
        let initial = request
            .preloaded_state
            .unwrap_or_else(|| request.reducer.initial_state());
        let store: Arc<dyn StateStore<S, A>> = Arc::new(BasicStore::new(request.reducer, initial));
        Ok(match request.enhancer {
            Some(enhancer) => enhancer.enhance(store),
            None => store,
        })
    }
}
