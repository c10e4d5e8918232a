use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A capability is either an on/off flag or a descriptive string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Flag(bool),
    Text(String),
}

impl CapabilityValue {
    /// Flags read as themselves; a descriptive value counts as supported.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => !text.is_empty(),
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<&str> for CapabilityValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Capability overrides, merged over the platform defaults at gateway
/// construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitiesConfig(pub BTreeMap<String, CapabilityValue>);

impl CapabilitiesConfig {
    pub fn get(&self, name: &str) -> Option<&CapabilityValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CapabilityValue)> {
        self.0.iter()
    }
}
