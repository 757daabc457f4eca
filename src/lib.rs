//! Volttron Central console core
//!
//! Stores, dispatcher, RPC exchange and action creators behind the console.
//! Exposes modules for integration testing and binary reuse.

pub mod actions;
pub mod app;
pub mod domain;
pub mod infra;
pub mod io;
pub mod services;

pub use app::Console;
