//! Infrastructure - configuration, dispatcher, stores and session storage
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `dispatcher` - Synchronous, non-reentrant action dispatcher
//! - `store` - `Store` trait and the shared `StoreHandle`
//! - `session_storage` - Persisted session keys (JSON file or memory)

pub mod config;
pub mod dispatcher;
pub mod session_storage;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use dispatcher::{DispatchError, DispatchToken, Dispatcher, Reducer};
pub use session_storage::{FileSessionStorage, MemorySessionStorage, SessionStorage, StorageError};
pub use store::{Store, StoreHandle};
