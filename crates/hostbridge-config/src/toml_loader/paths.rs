//! Where the bridge config lives, and seeding it on first run.

use hostbridge_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "hostbridge";
const CONFIG_FILE: &str = "config.toml";

/// `<config_dir>/hostbridge/config.toml`, e.g. `~/.config/hostbridge/config.toml`
/// on Linux.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| ConfigError::ParseError("no per-user config directory on this platform".into()))
}

/// Write the commented template to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_err = |what: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {what} {}: {e}", target.display()))
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err("create config directory", dir, e))?;
    }
    std::fs::write(path, default_config_toml())
        .map_err(|e| io_err("write default bridge config to", path, e))?;

    info!(path = %path.display(), "wrote default bridge config");
    Ok(())
}
