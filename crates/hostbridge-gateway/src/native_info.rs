//! Static platform descriptor reported by `get_native_info`.

use hostbridge_config::schema::PlatformConfig;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeInfo {
    pub platform_type: String,
    pub platform_details: String,
    /// Version string reported by the host.
    pub version: String,
}

impl NativeInfo {
    /// Describe the running platform, honoring configured overrides.
    pub fn detect(platform: &PlatformConfig, version: impl Into<String>) -> Self {
        let platform_type = platform
            .platform_type
            .clone()
            .unwrap_or_else(|| platform_name(std::env::consts::OS));
        let platform_details = platform.platform_details.clone().unwrap_or_else(|| {
            format!(
                "{} {}",
                platform_name(std::env::consts::OS),
                std::env::consts::ARCH
            )
        });
        Self {
            platform_type,
            platform_details,
            version: version.into(),
        }
    }
}

/// Display name for an OS identifier as found in `std::env::consts::OS`.
pub fn platform_name(os: &str) -> String {
    match os {
        "windows" => "Windows".into(),
        "linux" => "Linux".into(),
        "macos" => "macOS".into(),
        other => other.into(),
    }
}
