//! Host protocol revisions and the behavior each one implies.

use std::fmt;

use hostbridge_common::{BridgeError, ConfigError};

/// A revision of the host method surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProtocolVersion {
    /// `sync(username, password)`; no `kill` before `stop_daemon`.
    V1,
    /// `sync` takes a trailing purge flag.
    V2,
    /// Purge flag, and the daemon is sent `kill` before `stop_daemon`.
    #[default]
    V3,
}

/// Behavior switches derived from a [`ProtocolVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolFeatures {
    pub sync_purge_flag: bool,
    pub kill_before_stop: bool,
}

impl ProtocolVersion {
    pub const LATEST: Self = Self::V3;

    pub fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    pub fn features(self) -> ProtocolFeatures {
        match self {
            Self::V1 => ProtocolFeatures {
                sync_purge_flag: false,
                kill_before_stop: false,
            },
            Self::V2 => ProtocolFeatures {
                sync_purge_flag: true,
                kill_before_stop: false,
            },
            Self::V3 => ProtocolFeatures {
                sync_purge_flag: true,
                kill_before_stop: true,
            },
        }
    }
}

impl TryFrom<u32> for ProtocolVersion {
    type Error = BridgeError;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(ConfigError::ValidationError(format!(
                "unknown host protocol version {other}"
            ))
            .into()),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}
