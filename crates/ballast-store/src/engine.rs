//! The synchronization engine.
//!
//! [`StoreMirror`] owns the bootstrap: load persisted state, merge it with
//! the reducer's defaults and any caller override, persist the result when
//! it differs, and hand out a [`SyncedStore`]. The handle is store-shaped
//! (`state` / `dispatch` / `subscribe` / `replace_reducer` / `observe`) and
//! keeps the storage mirror current through a short-lived write buffer,
//! while a background task folds changes made by other writers back into
//! the snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use ballast_core::{
    merge_or_replace, Listener, ListenerId, ListenerSet, Reducer, Snapshot, StateObserver,
    StateStore, StoreBuilder, StoreEnhancer, StoreRequest, Unsubscribe,
};
use ballast_storage::StorageBackend;

use crate::buffer::WriteBuffer;
use crate::config::MirrorConfig;
use crate::error::{Result, StoreError};

/// Everything a state type needs to be mirrored: cloneable, comparable for
/// change suppression, and convertible to and from the persisted JSON tree.
pub trait MirroredState:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> MirroredState for T where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Shared engine state behind every [`SyncedStore`] clone.
struct EngineInner<S, A> {
    builder: Arc<dyn StoreBuilder<S, A>>,
    reducer: Arc<Mutex<Arc<dyn Reducer<S, A>>>>,
    enhancer: Option<Arc<dyn StoreEnhancer<S, A>>>,
    storage: Arc<dyn StorageBackend>,
    buffer_life: Duration,
    /// The authoritative, most recently reconciled state.
    snapshot: Snapshot<S>,
    /// Reference value for write suppression: the last state handed to the
    /// backend (or read from the buffer store at activation).
    last_persisted: Mutex<Option<S>>,
    buffer: WriteBuffer<S, A>,
    listeners: Arc<ListenerSet<()>>,
}

impl<S, A> EngineInner<S, A>
where
    S: MirroredState,
    A: Send + 'static,
{
    fn build_store(&self, preloaded: Option<S>) -> Result<Arc<dyn StateStore<S, A>>> {
        let reducer = self.reducer.lock().clone();
        let store = self.builder.build(StoreRequest {
            reducer,
            preloaded_state: preloaded,
            enhancer: self.enhancer.clone(),
        })?;
        Ok(store)
    }

    /// Record `state` as the write-suppression reference. Returns `false`
    /// when it already equals the reference, meaning a write would be
    /// redundant.
    fn mark_persisted(&self, state: &S) -> bool {
        let mut last = self.last_persisted.lock();
        if last.as_ref() == Some(state) {
            return false;
        }
        *last = Some(state.clone());
        true
    }

    /// Hand `state` to the backend on a spawned task. Failures are surfaced
    /// where the write happens and never retried; the snapshot is untouched.
    fn persist(&self, state: &S) {
        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                let error = StoreError::Codec(e);
                error!(%error, "state serialization failed, dropping write");
                return;
            }
        };
        let storage = self.storage.clone();
        tokio::spawn(async move {
            if let Err(e) = storage.save(&value).await {
                let error = StoreError::Persistence(e);
                error!(%error, "buffered state persistence failed");
            }
        });
    }

    /// Fold an externally observed document into the snapshot. Equal values
    /// (our own echoes, or a foreign writer landing on the same state) are
    /// absorbed without listener fan-out.
    fn reconcile(&self, incoming: Value) {
        let incoming: S = match serde_json::from_value(incoming) {
            Ok(state) => state,
            Err(error) => {
                warn!(%error, "ignoring undecodable storage change");
                return;
            }
        };
        if incoming == self.snapshot.get() {
            return;
        }
        self.snapshot.set(incoming);
        self.listeners.notify(&());
    }
}

fn spawn_reconcile<S, A>(inner: &Arc<EngineInner<S, A>>, mut changes: broadcast::Receiver<Value>)
where
    S: MirroredState,
    A: Send + 'static,
{
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(value) => {
                    let Some(inner) = weak.upgrade() else { break };
                    inner.reconcile(value);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "storage change stream lagged, continuing with latest");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Initialization gate for a mirrored store.
///
/// `init` is idempotent: the first call performs the load-merge-persist
/// bootstrap and every later call returns the same [`SyncedStore`] without
/// touching the backend. Concurrent calls are serialized.
pub struct StoreMirror<S, A> {
    builder: Arc<dyn StoreBuilder<S, A>>,
    reducer: Arc<Mutex<Arc<dyn Reducer<S, A>>>>,
    enhancer: Option<Arc<dyn StoreEnhancer<S, A>>>,
    storage: Arc<dyn StorageBackend>,
    buffer_life: Duration,
    /// Caller-supplied override, taken out during init so it cannot leak
    /// into the default-state probe.
    seed: Mutex<Option<S>>,
    handle: tokio::sync::Mutex<Option<SyncedStore<S, A>>>,
}

impl<S, A> StoreMirror<S, A>
where
    S: MirroredState,
    A: Send + 'static,
{
    /// Create the mirror from its configuration. No I/O happens here.
    pub fn new(config: MirrorConfig<S, A>) -> Self {
        Self {
            builder: config.builder,
            reducer: Arc::new(Mutex::new(config.reducer)),
            enhancer: config.enhancer,
            storage: config.storage,
            buffer_life: config.buffer_life,
            seed: Mutex::new(config.initial_state),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Initialize and return the store handle.
    ///
    /// The initial state is persisted state merged over the reducer's
    /// defaults (when anything was persisted), with the caller's override
    /// merged over that; if the result differs from what storage held, it is
    /// written back immediately so the backend always reflects at least the
    /// defaults. A factory failure is fatal; a failed initial write is
    /// logged and tolerated: the in-memory state is correct and the mirror
    /// catches up on the next successful write.
    pub async fn init(&self) -> Result<SyncedStore<S, A>> {
        let mut slot = self.handle.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        let seed = self.seed.lock().take();
        let reducer = self.reducer.lock().clone();
        let transient = self.builder.build(StoreRequest {
            reducer,
            preloaded_state: None,
            enhancer: self.enhancer.clone(),
        })?;
        let default_state = transient.state();

        self.storage.init().await?;
        // subscribe before loading so changes racing the load are buffered,
        // not missed
        let changes = self.storage.changes();
        let loaded = self.storage.load().await?;

        let (state, state_value) = compute_initial_state(&default_state, loaded.as_ref(), seed)?;

        let inner = Arc::new(EngineInner {
            builder: self.builder.clone(),
            reducer: self.reducer.clone(),
            enhancer: self.enhancer.clone(),
            storage: self.storage.clone(),
            buffer_life: self.buffer_life,
            snapshot: Snapshot::new(state),
            last_persisted: Mutex::new(None),
            buffer: WriteBuffer::new(),
            listeners: Arc::new(ListenerSet::new()),
        });
        spawn_reconcile(&inner, changes);

        if loaded.as_ref() != Some(&state_value) {
            if let Err(e) = self.storage.save(&state_value).await {
                let error = StoreError::Persistence(e);
                error!(%error, "initial state persistence failed");
            }
        }

        let handle = SyncedStore { inner };
        *slot = Some(handle.clone());
        Ok(handle)
    }
}

/// Merge defaults, persisted state and the caller override into the initial
/// state, degrading stepwise to defaults when persisted data does not decode
/// to `S`.
fn compute_initial_state<S>(
    default_state: &S,
    loaded: Option<&Value>,
    seed: Option<S>,
) -> Result<(S, Value)>
where
    S: MirroredState,
{
    let default_value = serde_json::to_value(default_state)?;
    let seed_value = seed.map(|s| serde_json::to_value(&s)).transpose()?;

    let mut merged = match loaded {
        Some(persisted) => merge_or_replace(default_value.clone(), persisted.clone()),
        None => default_value.clone(),
    };
    if let Some(seed_value) = &seed_value {
        merged = merge_or_replace(merged, seed_value.clone());
    }

    match serde_json::from_value::<S>(merged.clone()) {
        Ok(state) => Ok((state, merged)),
        Err(error) => {
            warn!(%error, "persisted state does not decode, falling back to defaults");
            let mut fallback = default_value;
            if let Some(seed_value) = seed_value {
                fallback = merge_or_replace(fallback, seed_value);
            }
            match serde_json::from_value::<S>(fallback.clone()) {
                Ok(state) => Ok((state, fallback)),
                Err(error) => {
                    warn!(%error, "initial-state override does not decode, using reducer defaults");
                    Ok((default_state.clone(), serde_json::to_value(default_state)?))
                }
            }
        }
    }
}

/// Store-shaped handle over the synchronization engine.
///
/// Cheap to clone; all clones share one snapshot, write buffer and listener
/// registry. Obtained from [`StoreMirror::init`].
pub struct SyncedStore<S, A> {
    inner: Arc<EngineInner<S, A>>,
}

impl<S, A> Clone for SyncedStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, A> std::fmt::Debug for SyncedStore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedStore").finish_non_exhaustive()
    }
}

impl<S, A> SyncedStore<S, A>
where
    S: MirroredState,
    A: Send + 'static,
{
    /// The most recently reconciled snapshot. Synchronous, never blocks.
    pub fn state(&self) -> S {
        self.inner.snapshot.get()
    }

    /// Apply an action through the write buffer.
    ///
    /// The first dispatch after an empty buffer constructs a fresh store
    /// seeded with the snapshot and opens a lifetime window; every dispatch
    /// within the window reuses that store, so a burst costs one storage
    /// write, performed when the window closes and only if the final state
    /// differs from the reference value. Actions whose effects land after
    /// the window has closed are covered by a per-dispatch listener that
    /// persists the late state once and detaches.
    ///
    /// Must be called within a tokio runtime: the window timer and the
    /// persistence writes run as spawned tasks. A factory failure building
    /// the buffer store surfaces here synchronously.
    pub fn dispatch(&self, action: A) -> Result<()> {
        let inner = &self.inner;
        let (store, opened) = inner.buffer.get_or_activate(|| {
            let store = inner.build_store(Some(inner.snapshot.get()))?;
            *inner.last_persisted.lock() = Some(store.state());
            debug!("write buffer opened");
            Ok::<_, StoreError>(store)
        })?;
        if opened {
            // The timer owns the window: it resets the buffer and performs
            // the one coalesced write for everything the window absorbed.
            let weak = Arc::downgrade(inner);
            let window_store = store.clone();
            let life = inner.buffer_life;
            tokio::spawn(async move {
                tokio::time::sleep(life).await;
                let Some(inner) = weak.upgrade() else { return };
                inner.buffer.clear();
                let state = window_store.state();
                if inner.mark_persisted(&state) {
                    inner.persist(&state);
                }
                debug!("write buffer closed");
            });
        }

        // Arm a persist-once listener against the captured store for effects
        // that resolve after the window closed. While its own window is
        // open, the closing write covers every notification, so the
        // listener stays dormant; afterwards it persists the first
        // effective state it sees and detaches.
        let armed = Arc::new(AtomicBool::new(true));
        let registration: Arc<OnceLock<ListenerId>> = Arc::new(OnceLock::new());
        let weak_inner = Arc::downgrade(inner);
        let weak_store = Arc::downgrade(&store);
        let listener: Listener<S> = {
            let armed = armed.clone();
            let registration = registration.clone();
            Arc::new(move |notified: &S| {
                if !armed.load(Ordering::Acquire) {
                    return;
                }
                let Some(inner) = weak_inner.upgrade() else {
                    return;
                };
                let captured = weak_store.upgrade();
                let state = match inner.buffer.active() {
                    Some(shared) => {
                        if captured.as_ref().is_some_and(|c| Arc::ptr_eq(&shared, c)) {
                            // own window still open: the closing write covers this
                            return;
                        }
                        // a newer window is open; it is authoritative
                        shared.state()
                    }
                    None => notified.clone(),
                };
                if !inner.mark_persisted(&state) {
                    return;
                }
                if armed.swap(false, Ordering::AcqRel) {
                    inner.persist(&state);
                    if let (Some(store), Some(id)) = (captured, registration.get().copied()) {
                        store.unsubscribe(id);
                    }
                }
            })
        };
        let id = store.subscribe(listener);
        let _ = registration.set(id);

        store.dispatch(action);
        Ok(())
    }

    /// Register a change listener, invoked whenever a reconciled snapshot
    /// replacement happens. The guard's `unsubscribe` is idempotent.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        let id = self.inner.listeners.add(Arc::new(move |_: &()| listener()));
        Unsubscribe::new(&self.inner.listeners, id)
    }

    /// Swap the reducer used by all future store constructions. An active
    /// buffer keeps the reducer it was built with.
    pub fn replace_reducer(&self, next: Arc<dyn Reducer<S, A>>) -> &Self {
        *self.inner.reducer.lock() = next;
        self
    }

    /// Push the current state to `observer` immediately, then every
    /// reconciled state after it, until the returned guard unsubscribes.
    pub fn observe(&self, observer: Arc<dyn StateObserver<S>>) -> Unsubscribe {
        observer.next(&self.inner.snapshot.get());
        let weak = Arc::downgrade(&self.inner);
        self.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                observer.next(&inner.snapshot.get());
            }
        })
    }

    /// Number of snapshot replacements since initialization. Diagnostic
    /// counter; a suppressed echo does not move it.
    pub fn snapshot_version(&self) -> u64 {
        self.inner.snapshot.version()
    }
}
