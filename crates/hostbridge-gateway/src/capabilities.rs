//! Capability flags: which native features this host build offers.

use std::collections::BTreeMap;

use hostbridge_common::BridgeError;
use hostbridge_config::schema::{CapabilitiesConfig, CapabilityValue};
use serde_json::{Map, Value};

pub const SUPPORTS_APP_WHITELIST: &str = "supports_app_whitelist";
pub const SUPPORTS_PRC_WHITELIST: &str = "supports_prc_whitelist";
pub const SUPPORTS_PROXY_CONF: &str = "supports_proxy_conf";
pub const SUPPORTS_LISTEN_ALL: &str = "supports_listen_all";
pub const SUPPORTS_VPN_CONF: &str = "supports_vpn_conf";
pub const SUPPORTS_AUTOUPDATE: &str = "supports_autoupdate";

/// Read-only capability map, fixed when the gateway is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFlags {
    flags: BTreeMap<String, CapabilityValue>,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self::platform_defaults()
    }
}

impl CapabilityFlags {
    /// The flags a desktop host ships with.
    pub fn platform_defaults() -> Self {
        let flags = [
            (SUPPORTS_APP_WHITELIST, false),
            (SUPPORTS_PRC_WHITELIST, true),
            (SUPPORTS_PROXY_CONF, true),
            (SUPPORTS_LISTEN_ALL, true),
            (SUPPORTS_VPN_CONF, false),
            (SUPPORTS_AUTOUPDATE, true),
        ]
        .into_iter()
        .map(|(name, flag)| (name.to_string(), CapabilityValue::Flag(flag)))
        .collect();
        Self { flags }
    }

    /// Platform defaults with the configured overrides applied.
    pub fn from_config(config: &CapabilitiesConfig) -> Self {
        let mut caps = Self::platform_defaults();
        caps.merge(
            config
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        caps
    }

    /// Overlay flags reported by the host. Booleans and strings are taken
    /// as-is; any other JSON type is rejected.
    pub fn merge_host_report(&mut self, report: Value) -> Result<(), BridgeError> {
        let report = match report {
            Value::Object(map) => map,
            Value::String(raw) => serde_json::from_str::<Map<String, Value>>(&raw).map_err(|e| {
                BridgeError::MalformedResponse(format!("invalid capability report: {e}"))
            })?,
            other => {
                return Err(BridgeError::MalformedResponse(format!(
                    "capability report must be an object, got {other}"
                )))
            }
        };

        let mut parsed = Vec::with_capacity(report.len());
        for (name, value) in report {
            let value = match value {
                Value::Bool(flag) => CapabilityValue::Flag(flag),
                Value::String(text) => CapabilityValue::Text(text),
                other => {
                    return Err(BridgeError::MalformedResponse(format!(
                        "capability {name} has unsupported value {other}"
                    )))
                }
            };
            parsed.push((name, value));
        }
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, overrides: impl IntoIterator<Item = (String, CapabilityValue)>) {
        self.flags.extend(overrides);
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityValue> {
        self.flags.get(name)
    }

    /// Unknown capabilities are unsupported.
    pub fn is_supported(&self, name: &str) -> bool {
        self.get(name).is_some_and(CapabilityValue::is_enabled)
    }

    pub fn supports_app_whitelist(&self) -> bool {
        self.is_supported(SUPPORTS_APP_WHITELIST)
    }

    pub fn supports_prc_whitelist(&self) -> bool {
        self.is_supported(SUPPORTS_PRC_WHITELIST)
    }

    pub fn supports_proxy_conf(&self) -> bool {
        self.is_supported(SUPPORTS_PROXY_CONF)
    }

    pub fn supports_listen_all(&self) -> bool {
        self.is_supported(SUPPORTS_LISTEN_ALL)
    }

    pub fn supports_vpn_conf(&self) -> bool {
        self.is_supported(SUPPORTS_VPN_CONF)
    }

    pub fn supports_autoupdate(&self) -> bool {
        self.is_supported(SUPPORTS_AUTOUPDATE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapabilityValue)> {
        self.flags.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.flags).unwrap_or(Value::Null)
    }
}
