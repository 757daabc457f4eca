//! Errors surfaced by the RPC exchange

use crate::infra::dispatcher::DispatchError;
use crate::io::transport::TransportError;
use thiserror::Error;

/// JSON-RPC code for invalid params; the historian uses it for "not running"
pub const INVALID_PARAMS: i64 = -32602;
pub const UNAUTHORIZED: i64 = 401;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Non-2xx status, timeout, network failure or undecodable body
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Error object returned by the server
    #[error("{message}")]
    Application {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// `result` did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Dispatching the exchange bookkeeping failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl RpcError {
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Application { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            RpcError::Transport(e) => e.http_status(),
            _ => None,
        }
    }

    /// Code 401 in the error object or an HTTP 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(UNAUTHORIZED) || self.http_status() == Some(401)
    }

    pub fn is_historian_unavailable(&self) -> bool {
        matches!(self, RpcError::Application { code: INVALID_PARAMS, message, .. } if message == "historian unavailable")
    }

    /// Message shown to the user
    pub fn message(&self) -> String {
        self.to_string()
    }
}
