//! Account data passed through `sync` and the projections made from its
//! payload.

use std::fmt;

use chrono::{DateTime, Utc};
use hostbridge_common::BridgeError;
use serde::Serialize;
use serde_json::Value;

pub const FREE_LEVEL: &str = "free";

/// Login credentials forwarded to the host. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Subscription tier and expiry of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionInfo {
    pub level: String,
    pub expires: Option<DateTime<Utc>>,
}

impl Default for SubscriptionInfo {
    fn default() -> Self {
        Self {
            level: FREE_LEVEL.to_string(),
            expires: None,
        }
    }
}

impl SubscriptionInfo {
    /// Project `user.subscription.{level, expires_unix}` out of a sync
    /// payload. Missing pieces fall back to a free tier with no expiry.
    pub fn from_sync_payload(payload: &Value) -> Self {
        let subscription = &payload["user"]["subscription"];

        let level = subscription["level"]
            .as_str()
            .map(str::to_lowercase)
            .unwrap_or_else(|| FREE_LEVEL.to_string());

        let expires = subscription
            .get("expires_unix")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Self { level, expires }
    }

    pub fn expires_millis(&self) -> Option<i64> {
        self.expires.map(|t| t.timestamp_millis())
    }
}

/// Project the `exits` list out of a sync payload. `null` when absent.
pub fn exits_from_sync_payload(payload: &Value) -> Value {
    payload.get("exits").cloned().unwrap_or(Value::Null)
}

/// The `sync` result is itself JSON, normally delivered as a string.
pub fn parse_sync_payload(result: Value) -> Result<Value, BridgeError> {
    match result {
        Value::String(raw) => serde_json::from_str(raw.trim())
            .map_err(|e| BridgeError::MalformedResponse(format!("invalid sync payload: {e}"))),
        Value::Object(_) => Ok(result),
        other => Err(BridgeError::MalformedResponse(format!(
            "sync payload must be JSON text, got {other}"
        ))),
    }
}
