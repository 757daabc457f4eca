//! Synchronous action dispatcher
//!
//! Reducers are registered with the tokens of the reducers they depend on and
//! run in that order for every dispatched action. A dependency can only name a
//! token that already exists, so registration order is a valid topological
//! order and the wait-for graph can never contain a cycle.
//!
//! A dispatch runs to completion before the next one starts. Dispatches from
//! other threads wait on the dispatch lock; a dispatch issued from inside a
//! reducer on the dispatching thread is rejected.

use crate::domain::action::{Action, ActionType};
use crate::infra::store::{Store, StoreHandle};
use parking_lot::{ReentrantMutex, RwLock};
use smallvec::SmallVec;
use std::cell::Cell;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// An action name that is not part of the closed action set
    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    /// A dispatch was issued while another dispatch was running on this thread
    #[error("cannot dispatch {action} in the middle of a dispatch")]
    NestedDispatch { action: ActionType },

    /// A registration named a token this dispatcher never issued
    #[error("reducer {name} depends on unknown token {token}")]
    UnknownDependency { name: String, token: usize },
}

/// Identifies a registered reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchToken(usize);

impl DispatchToken {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Receives every dispatched action
pub trait Reducer: Send + Sync {
    fn reduce(&self, action: &Action);
}

struct Registration {
    name: String,
    depends_on: SmallVec<[DispatchToken; 4]>,
    reducer: Arc<dyn Reducer>,
}

pub struct Dispatcher {
    registry: RwLock<Vec<Registration>>,
    dispatching: ReentrantMutex<Cell<bool>>,
}

/// Clears the in-progress flag even if a reducer panics
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { registry: RwLock::new(Vec::new()), dispatching: ReentrantMutex::new(Cell::new(false)) }
    }

    /// Register a reducer that runs after every reducer in `depends_on`
    pub fn register(
        &self,
        name: &str,
        depends_on: &[DispatchToken],
        reducer: Arc<dyn Reducer>,
    ) -> Result<DispatchToken, DispatchError> {
        let mut registry = self.registry.write();
        if let Some(unknown) = depends_on.iter().find(|t| t.0 >= registry.len()) {
            return Err(DispatchError::UnknownDependency { name: name.to_string(), token: unknown.0 });
        }

        let token = DispatchToken(registry.len());
        registry.push(Registration {
            name: name.to_string(),
            depends_on: depends_on.iter().copied().collect(),
            reducer,
        });
        debug!(reducer = name, token = token.0, depends_on = depends_on.len(), "reducer_registered");
        Ok(token)
    }

    /// Register a store; its change notifications fire after its reducer runs
    pub fn register_store<S: Store>(
        &self,
        name: &str,
        depends_on: &[DispatchToken],
        handle: &StoreHandle<S>,
    ) -> Result<DispatchToken, DispatchError> {
        self.register(name, depends_on, Arc::new(handle.clone()))
    }

    /// Run every registered reducer for `action`, in dependency order
    pub fn dispatch(&self, action: Action) -> Result<(), DispatchError> {
        let action_type = action.action_type();
        let flag = self.dispatching.lock();
        if flag.get() {
            return Err(DispatchError::NestedDispatch { action: action_type });
        }
        flag.set(true);
        let _guard = DispatchGuard(&flag);

        // Snapshot so reducers may read the registry (e.g. `is_dispatching`)
        let reducers: Vec<Arc<dyn Reducer>> =
            self.registry.read().iter().map(|r| Arc::clone(&r.reducer)).collect();

        debug!(action = %action_type, reducers = reducers.len(), "action_dispatched");
        for reducer in reducers {
            reducer.reduce(&action);
        }
        Ok(())
    }

    /// True while a dispatch is running on the calling thread
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.try_lock().map(|flag| flag.get()).unwrap_or(true)
    }

    /// Names of registered reducers in execution order
    pub fn reducer_names(&self) -> Vec<String> {
        self.registry.read().iter().map(|r| r.name.clone()).collect()
    }

    /// Tokens a reducer waits for
    pub fn dependencies(&self, token: DispatchToken) -> Vec<DispatchToken> {
        self.registry
            .read()
            .get(token.0)
            .map(|r| r.depends_on.to_vec())
            .unwrap_or_default()
    }
}
