//! The write-buffer state machine.

use std::sync::Arc;

use ballast_core::StateStore;
use parking_lot::Mutex;

/// Coalescing target for a burst of dispatches.
///
/// At most one underlying store is active at a time: the first dispatch
/// after `Empty` activates one, every dispatch within the lifetime window
/// reuses it, and the expiry timer resets the machine to `Empty`. Resetting
/// is always safe; in-flight dispatches hold their own reference to the
/// store they were dispatched against.
pub(crate) struct WriteBuffer<S, A> {
    state: Mutex<BufferState<S, A>>,
}

enum BufferState<S, A> {
    Empty,
    Active(Arc<dyn StateStore<S, A>>),
}

impl<S, A> WriteBuffer<S, A> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(BufferState::Empty),
        }
    }

    /// The active store, if the buffer window is open.
    pub(crate) fn active(&self) -> Option<Arc<dyn StateStore<S, A>>> {
        match &*self.state.lock() {
            BufferState::Active(store) => Some(store.clone()),
            BufferState::Empty => None,
        }
    }

    /// Return the active store, or activate the one `create` produces.
    ///
    /// The boolean is `true` when this call performed the activation. The
    /// lock is held across `create`, so concurrent dispatches cannot
    /// activate two buffers.
    pub(crate) fn get_or_activate<E>(
        &self,
        create: impl FnOnce() -> Result<Arc<dyn StateStore<S, A>>, E>,
    ) -> Result<(Arc<dyn StateStore<S, A>>, bool), E> {
        let mut state = self.state.lock();
        if let BufferState::Active(store) = &*state {
            return Ok((store.clone(), false));
        }
        let store = create()?;
        *state = BufferState::Active(store.clone());
        Ok((store, true))
    }

    /// Reset to `Empty`.
    pub(crate) fn clear(&self) {
        *self.state.lock() = BufferState::Empty;
    }
}
