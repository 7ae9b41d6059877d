//! Initialization: idempotence, merge precedence, first-write behavior.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use ballast_core::{BuildError, Reducer, StateStore, StoreBuilder, StoreRequest};
use ballast_storage::MemoryBackend;
use ballast_store::{BasicStoreBuilder, MirrorConfig, StoreError, StoreMirror};

use common::{counter_config, settle, Counter, CounterAction};

#[tokio::test(start_paused = true)]
async fn repeated_init_returns_the_same_engine_without_io() {
    let backend = MemoryBackend::new();
    let mirror = StoreMirror::new(counter_config(backend.clone()));

    let first = mirror.init().await.unwrap();
    let loads_after_first = backend.load_count();
    let saves_after_first = backend.save_count();

    let second = mirror.init().await.unwrap();
    assert_eq!(backend.load_count(), loads_after_first);
    assert_eq!(backend.save_count(), saves_after_first);

    // both handles drive the same engine
    first.dispatch(CounterAction::Add(3)).unwrap();
    common::expire_window().await;
    assert_eq!(second.state(), Counter::at(3));
}

#[tokio::test(start_paused = true)]
async fn first_init_persists_reducer_defaults() {
    let backend = MemoryBackend::new();
    let mirror = StoreMirror::new(counter_config(backend.clone()));

    let store = mirror.init().await.unwrap();
    settle().await;

    assert_eq!(store.state(), Counter::default());
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.contents().await, Some(json!({"value": 0})));
}

#[tokio::test(start_paused = true)]
async fn init_skips_the_write_when_persisted_state_already_matches() {
    let backend = MemoryBackend::new();
    backend.seed(json!({"value": 0})).await;
    let mirror = StoreMirror::new(counter_config(backend.clone()));

    let store = mirror.init().await.unwrap();
    settle().await;

    assert_eq!(store.state(), Counter::default());
    assert_eq!(backend.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn persisted_state_wins_over_defaults() {
    let backend = MemoryBackend::new();
    backend.seed(json!({"value": 41})).await;
    let mirror = StoreMirror::new(counter_config(backend.clone()));

    let store = mirror.init().await.unwrap();
    assert_eq!(store.state(), Counter::at(41));
}

/// Reducer over a raw JSON tree, for merge tests with partial documents.
struct PrefsReducer;

impl Reducer<Value, Value> for PrefsReducer {
    fn initial_state(&self) -> Value {
        json!({"a": 1, "b": 2})
    }

    fn reduce(&self, state: &Value, _action: &Value) -> Value {
        state.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn merge_precedence_is_override_over_persisted_over_defaults() {
    let backend = MemoryBackend::new();
    backend.seed(json!({"b": 3, "c": 4})).await;

    let config = MirrorConfig::<Value, Value>::new(
        Arc::new(BasicStoreBuilder),
        Arc::new(PrefsReducer),
        Arc::new(backend.clone()),
    )
    .with_initial_state(json!({"c": 5}));

    let store = StoreMirror::new(config).init().await.unwrap();
    settle().await;

    assert_eq!(store.state(), json!({"a": 1, "b": 3, "c": 5}));
    // the merged result differed from what was persisted, so it was written
    assert_eq!(backend.contents().await, Some(json!({"a": 1, "b": 3, "c": 5})));
}

#[tokio::test(start_paused = true)]
async fn undecodable_persisted_state_degrades_to_defaults() {
    let backend = MemoryBackend::new();
    backend.seed(json!({"value": "not a number"})).await;
    let mirror = StoreMirror::new(counter_config(backend.clone()));

    let store = mirror.init().await.unwrap();
    settle().await;

    assert_eq!(store.state(), Counter::default());
    // the garbage document was replaced with the defaults
    assert_eq!(backend.contents().await, Some(json!({"value": 0})));
}

/// Builder that fails every construction.
struct BrokenBuilder;

impl StoreBuilder<Counter, CounterAction> for BrokenBuilder {
    fn build(
        &self,
        _request: StoreRequest<Counter, CounterAction>,
    ) -> Result<Arc<dyn StateStore<Counter, CounterAction>>, BuildError> {
        Err(BuildError::new("broken by design of this test"))
    }
}

#[tokio::test(start_paused = true)]
async fn factory_failure_is_fatal_to_init() {
    let config = MirrorConfig::new(
        Arc::new(BrokenBuilder),
        Arc::new(common::CounterReducer),
        Arc::new(MemoryBackend::new()),
    );
    let err = StoreMirror::new(config).init().await.unwrap_err();
    assert!(matches!(err, StoreError::Construction(_)));
}

/// Builder that succeeds once (the default-state probe) and fails after.
struct FailsAfterFirstBuilder {
    builds: AtomicUsize,
}

impl StoreBuilder<Counter, CounterAction> for FailsAfterFirstBuilder {
    fn build(
        &self,
        request: StoreRequest<Counter, CounterAction>,
    ) -> Result<Arc<dyn StateStore<Counter, CounterAction>>, BuildError> {
        if self.builds.fetch_add(1, Ordering::SeqCst) == 0 {
            BasicStoreBuilder.build(request)
        } else {
            Err(BuildError::new("no more stores"))
        }
    }
}

#[tokio::test(start_paused = true)]
async fn factory_failure_surfaces_from_the_dispatch_that_needed_a_buffer() {
    let config = MirrorConfig::new(
        Arc::new(FailsAfterFirstBuilder {
            builds: AtomicUsize::new(0),
        }),
        Arc::new(common::CounterReducer),
        Arc::new(MemoryBackend::new()),
    );
    let store = StoreMirror::new(config).init().await.unwrap();

    let err = store.dispatch(CounterAction::Add(1)).unwrap_err();
    assert!(matches!(err, StoreError::Construction(_)));
    // the buffer stayed empty, so the next dispatch hits the factory again
    let err = store.dispatch(CounterAction::Add(1)).unwrap_err();
    assert!(matches!(err, StoreError::Construction(_)));
}
