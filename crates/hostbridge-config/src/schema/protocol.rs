use serde::{Deserialize, Serialize};

/// Newest host protocol revision this bridge speaks.
pub const LATEST_PROTOCOL_VERSION: u32 = 3;

/// Which host protocol revision to speak.
///
/// Revisions differ in small ways (whether `sync` takes a purge flag, whether
/// the daemon is sent `kill` before `stop_daemon`); the gateway branches on
/// this number instead of shipping one bridge per host build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Valid range: 1-3.
    pub version: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: LATEST_PROTOCOL_VERSION,
        }
    }
}
