//! Full configuration validation.
//!
//! Checks numeric ranges and collects every problem into a single
//! `ConfigError`.

mod helpers;


use crate::schema::{BridgeConfig, LATEST_PROTOCOL_VERSION};
use hostbridge_common::ConfigError;
use helpers::{validate_non_empty, validate_range, validate_range_u64};

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_range(
        &mut errors,
        "protocol.version",
        config.protocol.version,
        1,
        LATEST_PROTOCOL_VERSION,
    );
    validate_range_u64(
        &mut errors,
        "startup.poll_interval_ms",
        config.startup.poll_interval_ms,
        10,
        60_000,
    );

    for (name, _) in config.capabilities.iter() {
        if name.trim().is_empty() {
            errors.push("capabilities: capability names must not be empty".into());
        }
    }

    if let Some(platform_type) = &config.platform.platform_type {
        validate_non_empty(&mut errors, "platform.type", platform_type);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
