//! Store plumbing: owned state behind a lock plus a change signal
//!
//! Only the dispatcher writes to a store. Everything else reads through
//! `StoreHandle::read` and learns about changes through `subscribe`.

use crate::domain::action::Action;
use crate::infra::dispatcher::Reducer;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use tokio::sync::watch;

/// State that reacts to dispatched actions
pub trait Store: Send + Sync + 'static {
    /// Apply `action`; return true when subscribers should be notified
    fn reduce(&mut self, action: &Action) -> bool;
}

struct StoreCell<S> {
    state: RwLock<S>,
    changes: watch::Sender<u64>,
}

/// Shared handle to a store
pub struct StoreHandle<S> {
    inner: Arc<StoreCell<S>>,
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: Store> StoreHandle<S> {
    pub fn new(store: S) -> Self {
        let (changes, _) = watch::channel(0);
        Self { inner: Arc::new(StoreCell { state: RwLock::new(store), changes }) }
    }

    /// Read access; do not hold the guard across an `.await`
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.state.read()
    }

    /// Receiver that ticks after every change-emitting action
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Number of change notifications emitted so far
    pub fn version(&self) -> u64 {
        *self.inner.changes.borrow()
    }

    pub(crate) fn apply(&self, action: &Action) -> bool {
        let changed = self.inner.state.write().reduce(action);
        if changed {
            self.inner.changes.send_modify(|version| *version += 1);
        }
        changed
    }
}

impl<S: Store> Reducer for StoreHandle<S> {
    fn reduce(&self, action: &Action) {
        self.apply(action);
    }
}
