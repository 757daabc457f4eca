//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `transport` - HTTP POST transport for JSON-RPC bodies
//! - `exchange` - RPC client: envelopes, exchange bookkeeping, 401 interceptor
//! - `rpc_error` - Errors surfaced to action creators

pub mod exchange;
pub mod rpc_error;
pub mod transport;

// Re-export commonly used types
pub use exchange::{RpcClient, RpcRequest};
pub use rpc_error::RpcError;
pub use transport::{HttpTransport, Transport, TransportError};
