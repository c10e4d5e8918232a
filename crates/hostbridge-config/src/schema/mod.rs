//! Configuration schema types for the host bridge.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod capabilities;
mod platform;
mod protocol;
mod startup;
mod system;

pub use capabilities::*;
pub use platform::*;
pub use protocol::*;
pub use startup::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Every option has a default matching the newest host protocol, so an
/// empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub protocol: ProtocolConfig,
    pub startup: StartupConfig,
    pub capabilities: CapabilitiesConfig,
    pub platform: PlatformConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
