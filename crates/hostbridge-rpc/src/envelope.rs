//! Wire envelopes between the bridge and the host.
//!
//! Messages flow in both directions:
//! - **Bridge -> Host**: an [`IpcEnvelope`] serialized to one JSON string and
//!   handed to [`Transport::post_message`](crate::Transport::post_message).
//! - **Host -> Bridge**: the host invokes the envelope's `callback_code` with
//!   exactly one argument, the response. Hosts that cannot call back by name
//!   serialize the invocation as a [`HostInvocation`].
//!
//! A second JSON-RPC session can be tunneled through the first: the nested
//! request is stringified and carried as the single parameter of an outer
//! `daemon_rpc` / `binder_rpc` call, and its response comes back as the
//! outer call's string result.

use hostbridge_common::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{build_request, RpcRequest, RpcResponse};

/// Outbound message posted to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcEnvelope {
    /// Name the host must invoke with the response.
    pub callback_code: String,
    /// The request itself.
    pub inner: RpcRequest,
}

impl IpcEnvelope {
    pub fn new(callback_code: impl Into<String>, inner: RpcRequest) -> Self {
        Self {
            callback_code: callback_code.into(),
            inner,
        }
    }

    /// Serialize to the string handed to the transport.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::Transport(format!("failed to serialize envelope: {e}")))
    }

    /// Parse an envelope from a raw string (host side, and tests).
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// A serialized callback invocation coming back from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInvocation {
    pub callback_code: String,
    /// The single callback argument: a response object or its JSON string.
    #[serde(default)]
    pub argument: Value,
}

impl HostInvocation {
    pub fn new(callback_code: impl Into<String>, argument: Value) -> Self {
        Self {
            callback_code: callback_code.into(),
            argument,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(raw)
            .map_err(|e| BridgeError::MalformedResponse(format!("invalid host invocation: {e}")))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Stringify a nested request for `method` with `args`.
pub fn encode_nested(method: &str, args: Vec<Value>) -> Result<String, BridgeError> {
    build_request(method, args).to_json_string()
}

/// Unwrap the result of an outer `daemon_rpc` / `binder_rpc` call.
///
/// The nested response normally arrives as a JSON string; an already-decoded
/// object is accepted too. Anything else is malformed.
pub fn decode_nested(outer_result: Value) -> Result<Value, BridgeError> {
    let response = match outer_result {
        Value::String(raw) => RpcResponse::parse(raw.trim())?,
        Value::Object(_) => RpcResponse::from_value(outer_result)?,
        other => {
            return Err(BridgeError::MalformedResponse(format!(
                "nested response must be a string, got {other}"
            )))
        }
    };
    response.into_result()
}
