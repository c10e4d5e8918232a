//! Host call bridge core.
//!
//! Provides:
//! - JSON-RPC 2.0 request building and response parsing
//! - The outbound envelope and inbound callback invocation formats
//! - Nested (tunneled) RPC encoding for daemon and binder sessions
//! - A call correlator that matches asynchronous host replies to callers

pub mod codec;
pub mod correlator;
pub mod envelope;
pub mod transport;

use async_trait::async_trait;
use hostbridge_common::BridgeError;
use serde_json::Value;

pub use codec::{build_request, parse_response, RpcRequest, RpcResponse};
pub use correlator::CallCorrelator;
pub use envelope::{decode_nested, encode_nested, HostInvocation, IpcEnvelope};
pub use transport::{ChannelTransport, Transport};

/// Anything that can carry a JSON-RPC call to the host and return its result.
#[async_trait]
pub trait HostRpc: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError>;
}
