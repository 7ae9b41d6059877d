//! Reactive primitives: a versioned value cell and a listener registry.
//!
//! These are deliberately small and runtime-agnostic: sync locks, atomic
//! version counters, push notification. Async behavior (timers, persistence
//! tasks) belongs to the engine crate that composes them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

/// A value cell with a change-version counter.
///
/// Holds the engine's authoritative state snapshot. `get` clones the current
/// value, `set` replaces it and bumps the version. The version gives tests
/// and diagnostics a cheap way to count snapshot replacements.
pub struct Snapshot<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

impl<T: Clone + Send + Sync> Snapshot<T> {
    /// Wrap an initial value at version zero.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            version: AtomicU64::new(0),
        }
    }

    /// Clone the current value. Never blocks on I/O.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Replace the value and bump the version.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Number of replacements since construction.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T: Clone + Send + Sync + std::fmt::Debug> std::fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

/// A change callback carrying the notification payload.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identity of a registered listener, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An id-keyed registry of change listeners.
///
/// Insertion order is preserved but carries no correctness meaning. Removal
/// is by id, so removing twice (or an id that was never added) is a no-op.
pub struct ListenerSet<T> {
    entries: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> ListenerSet<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener and return its id.
    pub fn add(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, listener));
        id
    }

    /// Remove a listener by id. Unknown ids are ignored.
    pub fn remove(&self, id: ListenerId) {
        self.entries.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    /// Invoke every registered listener with `payload`.
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may subscribe or unsubscribe re-entrantly.
    pub fn notify(&self, payload: &T) {
        let listeners: Vec<Listener<T>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(payload);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Detaches a listener registered on a [`ListenerSet<()>`].
///
/// Calling [`unsubscribe`](Unsubscribe::unsubscribe) more than once, or never,
/// is safe; the guard holds the registry weakly and does nothing once the
/// registry is gone.
pub struct Unsubscribe {
    set: Weak<ListenerSet<()>>,
    id: ListenerId,
    done: AtomicBool,
}

impl Unsubscribe {
    /// Build a guard for `id` within `set`.
    pub fn new(set: &Arc<ListenerSet<()>>, id: ListenerId) -> Self {
        Self {
            set: Arc::downgrade(set),
            id,
            done: AtomicBool::new(false),
        }
    }

    /// Remove the listener from its registry. Idempotent.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
    }
}

/// Observation capability for state streams.
///
/// The typed stand-in for an observable-protocol observer: anything that can
/// receive a state push implements `next`. A malformed observer is
/// unrepresentable, so there is no runtime argument check to fail.
pub trait StateObserver<S>: Send + Sync {
    /// Receive the current state.
    fn next(&self, state: &S);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn snapshot_set_bumps_version() {
        let cell = Snapshot::new(1);
        assert_eq!(cell.version(), 0);
        cell.set(2);
        assert_eq!(cell.get(), 2);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn listener_set_notifies_all() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            set.add(Arc::new(move |payload: &u32| {
                assert_eq!(*payload, 7);
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        set.notify(&7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn remove_is_idempotent() {
        let set: ListenerSet<()> = ListenerSet::new();
        let id = set.add(Arc::new(|_| {}));
        assert_eq!(set.len(), 1);
        set.remove(id);
        set.remove(id);
        assert!(set.is_empty());
    }

    #[test]
    fn unsubscribe_guard_is_safe_twice() {
        let set = Arc::new(ListenerSet::<()>::new());
        let id = set.add(Arc::new(|_| {}));
        let guard = Unsubscribe::new(&set, id);
        guard.unsubscribe();
        guard.unsubscribe();
        assert!(set.is_empty());
    }

    #[test]
    fn unsubscribe_survives_dropped_registry() {
        let set = Arc::new(ListenerSet::<()>::new());
        let id = set.add(Arc::new(|_| {}));
        let guard = Unsubscribe::new(&set, id);
        drop(set);
        guard.unsubscribe();
    }
}
