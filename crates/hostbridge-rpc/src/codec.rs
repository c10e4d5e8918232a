//! JSON-RPC 2.0 request building and response parsing.
//!
//! Requests always carry protocol version `"2.0"` and the constant id `1`:
//! calls are correlated out-of-band by the envelope's callback code, never by
//! this id. Responses are normalized leniently because hosts disagree on the
//! shape of `error` (object, bare string, or `null` alongside a result).

use hostbridge_common::{BridgeError, RemoteError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed request id for every request this bridge emits.
pub const REQUEST_ID: u64 = 1;

/// An immutable JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

impl RpcRequest {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn version(&self) -> &str {
        &self.jsonrpc
    }

    /// Serialize to the compact JSON string form used for nested envelopes.
    pub fn to_json_string(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::Transport(format!("failed to serialize request: {e}")))
    }
}

/// Build a request for `method` with positional `params`.
pub fn build_request(method: impl Into<String>, params: Vec<Value>) -> RpcRequest {
    RpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: method.into(),
        params,
        id: REQUEST_ID,
    }
}

/// A decoded response: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Success(Value),
    Failure(RemoteError),
}

impl RpcResponse {
    /// Decode a response object.
    ///
    /// `error` wins when both fields are present; `error: null` counts as
    /// absent; a response with neither field is a success carrying `null`.
    pub fn from_value(value: Value) -> Result<Self, BridgeError> {
        let Value::Object(mut obj) = value else {
            return Err(BridgeError::MalformedResponse(format!(
                "expected a response object, got {}",
                json_kind(&value)
            )));
        };

        match obj.remove("error") {
            None | Some(Value::Null) => {}
            Some(error) => return Ok(Self::Failure(remote_error_from(error))),
        }

        Ok(Self::Success(obj.remove("result").unwrap_or(Value::Null)))
    }

    /// Decode the single argument the host passes to a callback. The host may
    /// hand over the response object itself or its JSON-encoded string.
    pub fn from_argument(argument: Value) -> Result<Self, BridgeError> {
        match argument {
            Value::String(raw) => Self::parse(&raw),
            other => Self::from_value(other),
        }
    }

    /// Decode a raw JSON response string.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BridgeError::MalformedResponse(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn success(result: Value) -> Self {
        Self::Success(result)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(RemoteError::new(message))
    }

    pub fn into_result(self) -> Result<Value, BridgeError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(err) => Err(BridgeError::Remote(err)),
        }
    }

    /// Encode as a JSON-RPC 2.0 response object.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));
        match self {
            Self::Success(result) => {
                obj.insert("result".into(), result.clone());
            }
            Self::Failure(err) => {
                let error = serde_json::to_value(err)
                    .unwrap_or_else(|_| serde_json::json!({ "message": err.message }));
                obj.insert("error".into(), error);
            }
        }
        obj.insert("id".into(), Value::from(REQUEST_ID));
        Value::Object(obj)
    }
}

/// Parse a raw response string, returning `result` verbatim on success.
pub fn parse_response(raw: &str) -> Result<Value, BridgeError> {
    RpcResponse::parse(raw)?.into_result()
}

fn remote_error_from(error: Value) -> RemoteError {
    match error {
        Value::String(message) => RemoteError::new(message),
        Value::Object(obj) => {
            let message = match obj.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => Value::Object(obj.clone()).to_string(),
            };
            RemoteError {
                code: obj.get("code").and_then(Value::as_i64),
                message,
                data: obj.get("data").cloned(),
            }
        }
        other => RemoteError::new(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
