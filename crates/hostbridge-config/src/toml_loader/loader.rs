//! Reading the bridge config from disk.

use crate::schema::BridgeConfig;
use crate::validation;
use hostbridge_common::ConfigError;
use std::path::Path;
use tracing::{debug, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse the bridge config at `path`.
///
/// Absent sections take their defaults. Out-of-range values are reported
/// but kept, so a caller can show them back to the user;
/// [`crate::load_config_from`] rejects them instead.
pub fn load_from_path(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read bridge config {}: {e}",
                path.display()
            )))
        }
    };

    let config: BridgeConfig = toml::from_str(&raw).map_err(|e| {
        ConfigError::ParseError(format!("bridge config {} is not valid TOML: {e}", path.display()))
    })?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "bridge config has out-of-range values");
    }

    debug!(
        path = %path.display(),
        protocol = config.protocol.version,
        "bridge config loaded"
    );
    Ok(config)
}

/// Load `hostbridge/config.toml` from the user's config directory, writing
/// the commented template there first if nothing exists yet.
pub fn load_default() -> Result<BridgeConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(BridgeConfig::default())
        }
        other => other,
    }
}
