//! RPC exchange: envelope building, bookkeeping actions and the 401 interceptor
//!
//! Every call dispatches `MAKE_REQUEST` before it goes out and
//! `RECEIVE_RESPONSE` or `FAIL_REQUEST` once it settles. An unauthorized
//! failure logs the session out (`RECEIVE_UNAUTHORIZED` then
//! `CLEAR_AUTHORIZATION`) before the caller sees the error.

use crate::domain::action::Action;
use crate::domain::types::ExchangeRecord;
use crate::infra::dispatcher::Dispatcher;
use crate::io::rpc_error::RpcError;
use crate::io::transport::Transport;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const REDACTED: &str = "[REDACTED]";

/// Node id for v1 request ids, random per process
fn node_id() -> &'static [u8; 6] {
    static NODE_ID: OnceLock<[u8; 6]> = OnceLock::new();
    NODE_ID.get_or_init(|| {
        let random = Uuid::new_v4();
        let mut id = [0u8; 6];
        id.copy_from_slice(&random.as_bytes()[..6]);
        id
    })
}

/// A JSON-RPC call to be made
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    method: String,
    params: Option<Value>,
    authorization: Option<String>,
    redacted: Vec<String>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: None, authorization: None, redacted: Vec::new() }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_authorization(mut self, token: Option<String>) -> Self {
        self.authorization = token;
        self
    }

    /// Hide a dotted parameter path (e.g. `password`) in the logged copy
    pub fn redact(mut self, path: impl Into<String>) -> Self {
        self.redacted.push(path.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    jsonrpc: &'static str,
    id: Uuid,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization: Option<&'a str>,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Replace each dotted path in `paths` with `[REDACTED]`; missing paths are ignored
pub fn redact(value: &mut Value, paths: &[String]) {
    for path in paths {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else { continue };
        let parent = segments.iter().try_fold(&mut *value, |node, key| node.get_mut(*key));
        if let Some(Value::Object(map)) = parent {
            if let Some(slot) = map.get_mut(last) {
                *slot = Value::String(REDACTED.to_string());
            }
        }
    }
}

pub struct RpcClient {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { transport, dispatcher }
    }

    /// Perform the call and decode `result` into `T`
    pub async fn call<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, RpcError> {
        let id = Uuid::now_v1(node_id());
        let envelope = Envelope {
            jsonrpc: "2.0",
            id,
            method: &request.method,
            params: request.params.as_ref(),
            authorization: request.authorization.as_deref(),
        };
        let body = serde_json::to_string(&envelope).map_err(|e| RpcError::Decode(e.to_string()))?;

        // The display copy is redacted after the network body is fixed
        let mut display = serde_json::to_value(&envelope).map_err(|e| RpcError::Decode(e.to_string()))?;
        if let Some(params) = display.get_mut("params") {
            redact(params, &request.redacted);
        }
        if let Some(authorization) = display.get_mut("authorization") {
            *authorization = Value::String(REDACTED.to_string());
        }

        self.dispatcher.dispatch(Action::MakeRequest {
            exchange: ExchangeRecord {
                id,
                method: request.method.clone(),
                request: display,
                initiated: Utc::now(),
            },
        })?;
        debug!(id = %id, method = %request.method, "rpc_request_sent");

        let start = Instant::now();
        let outcome = self.transport.send(body).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(response) => {
                let parsed = Self::parse_response(response);
                self.dispatcher.dispatch(Action::ReceiveResponse {
                    exchange_id: id,
                    elapsed_ms,
                    error: parsed.as_ref().err().map(|e| e.message()),
                })?;
                parsed.and_then(|value| {
                    serde_json::from_value::<T>(value).map_err(|e| RpcError::Decode(e.to_string()))
                })
            }
            Err(error) => {
                self.dispatcher.dispatch(Action::FailRequest {
                    exchange_id: id,
                    elapsed_ms,
                    error: error.to_string(),
                })?;
                Err(RpcError::Transport(error))
            }
        };

        match &result {
            Ok(_) => debug!(id = %id, method = %request.method, elapsed_ms = %elapsed_ms, "rpc_response_received"),
            Err(error) if error.is_unauthorized() => {
                info!(id = %id, method = %request.method, "rpc_unauthorized_logout");
                self.dispatcher.dispatch(Action::ReceiveUnauthorized { error: error.message() })?;
                self.dispatcher.dispatch(Action::ClearAuthorization)?;
            }
            Err(error) => warn!(
                id = %id,
                method = %request.method,
                elapsed_ms = %elapsed_ms,
                code = ?error.code(),
                error = %error,
                "rpc_request_failed"
            ),
        }
        result
    }

    fn parse_response(response: Value) -> Result<Value, RpcError> {
        let envelope: ResponseEnvelope =
            serde_json::from_value(response).map_err(|e| RpcError::Decode(e.to_string()))?;
        match envelope.error {
            Some(error) => Err(RpcError::Application { code: error.code, message: error.message, data: error.data }),
            None => Ok(envelope.result.unwrap_or(Value::Null)),
        }
    }
}
