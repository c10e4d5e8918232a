use serde::{Deserialize, Serialize};

/// Overrides for the native platform descriptor. Unset fields are detected
/// from the running OS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
    #[serde(rename = "details", skip_serializing_if = "Option::is_none")]
    pub platform_details: Option<String>,
}
