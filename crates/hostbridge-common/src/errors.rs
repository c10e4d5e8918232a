use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Structured error object returned by the host or a nested daemon/binder
/// session. Kept whole so callers can branch on `code`; `Display` yields the
/// message for UI use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("host channel closed before the call completed")]
    Disconnected,

    #[error("no pending call registered under {0}")]
    UnknownCallback(String),

    /// The last probe failure is kept for diagnostics.
    #[error("daemon did not become ready after {attempts} probes")]
    StartupTimedOut {
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("not supported by this host protocol: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// The string a UI shows for this failure. For remote errors this is the
    /// host-supplied message alone.
    pub fn display_message(&self) -> String {
        match self {
            Self::Remote(remote) => remote.message.clone(),
            other => other.to_string(),
        }
    }

    /// The structured remote error, if this failure came from the host.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}
