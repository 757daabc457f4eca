//! JSON-RPC transport over HTTP POST

use crate::infra::config::Config;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("response is not JSON: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TransportError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Sends one serialized JSON-RPC envelope and returns the decoded response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: String) -> Result<serde_json::Value, TransportError>;
}

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        // Create HTTP client once for reuse (connection pooling)
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms()))
            .build()?;
        Ok(Self { url: config.server_url().to_string(), client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> Result<serde_json::Value, TransportError> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "rpc_transport_error");
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(url = %self.url, status = %status.as_u16(), latency_ms = %latency_ms, "rpc_http_response");
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory transport answering from a queue of canned responses

    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Value, TransportError>>>,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful `result`
        pub fn reply(&self, result: Value) -> &Self {
            self.responses.lock().push_back(Ok(json!({"jsonrpc": "2.0", "result": result})));
            self
        }

        /// Queue a JSON-RPC error object
        pub fn reply_error(&self, code: i64, message: &str) -> &Self {
            self.responses
                .lock()
                .push_back(Ok(json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}})));
            self
        }

        pub fn fail(&self, error: TransportError) -> &Self {
            self.responses.lock().push_back(Err(error));
            self
        }

        /// Every request body sent so far, decoded
        pub fn requests(&self) -> Vec<Value> {
            self.requests.lock().clone()
        }

        pub fn methods(&self) -> Vec<String> {
            self.requests()
                .iter()
                .map(|r| r["method"].as_str().unwrap_or_default().to_string())
                .collect()
        }

        pub fn remaining(&self) -> usize {
            self.responses.lock().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, body: String) -> Result<Value, TransportError> {
            let request: Value = serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
        }
    }
}
