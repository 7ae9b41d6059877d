//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ballast_core::{Listener, ListenerId, Reducer, StateObserver, StateStore, StoreEnhancer};
use ballast_storage::MemoryBackend;
use ballast_store::{BasicStoreBuilder, MirrorConfig};

/// Minimal mirrored state used by most suites.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub value: i64,
}

impl Counter {
    pub fn at(value: i64) -> Self {
        Self { value }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum CounterAction {
    Add(i64),
    /// Reduces to the same state; exercises write suppression.
    Nothing,
}

pub struct CounterReducer;

impl Reducer<Counter, CounterAction> for CounterReducer {
    fn initial_state(&self) -> Counter {
        Counter::default()
    }

    fn reduce(&self, state: &Counter, action: &CounterAction) -> Counter {
        match action {
            CounterAction::Add(n) => Counter {
                value: state.value + n,
            },
            CounterAction::Nothing => state.clone(),
        }
    }
}

/// Counter engine config over `backend` with the default buffer lifetime.
pub fn counter_config(backend: MemoryBackend) -> MirrorConfig<Counter, CounterAction> {
    MirrorConfig::new(
        Arc::new(BasicStoreBuilder),
        Arc::new(CounterReducer),
        Arc::new(backend),
    )
}

/// Let spawned persistence and reconcile tasks run under the paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Advance past the default buffer window and let its write settle.
pub async fn expire_window() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

/// Observer that records every pushed state.
#[derive(Default)]
pub struct Recorder {
    seen: std::sync::Mutex<Vec<Counter>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Counter> {
        self.seen.lock().unwrap().clone()
    }
}

impl StateObserver<Counter> for Recorder {
    fn next(&self, state: &Counter) {
        self.seen.lock().unwrap().push(state.clone());
    }
}

/// Enhancer whose stores apply every action after a fixed delay, standing in
/// for action creators with asynchronous effects.
pub struct DeferredEnhancer {
    pub delay: Duration,
}

impl StoreEnhancer<Counter, CounterAction> for DeferredEnhancer {
    fn enhance(
        &self,
        inner: Arc<dyn StateStore<Counter, CounterAction>>,
    ) -> Arc<dyn StateStore<Counter, CounterAction>> {
        Arc::new(DeferredStore {
            inner,
            delay: self.delay,
        })
    }
}

struct DeferredStore {
    inner: Arc<dyn StateStore<Counter, CounterAction>>,
    delay: Duration,
}

impl StateStore<Counter, CounterAction> for DeferredStore {
    fn state(&self) -> Counter {
        self.inner.state()
    }

    fn dispatch(&self, action: CounterAction) {
        let inner = self.inner.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.dispatch(action);
        });
    }

    fn subscribe(&self, listener: Listener<Counter>) -> ListenerId {
        self.inner.subscribe(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner.unsubscribe(id);
    }
}
