//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Host bridge configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[protocol]
# Host protocol revision:
#   1 = sync(username, password), no kill before stop
#   2 = sync takes a purge flag
#   3 = purge flag, and the daemon is killed before stop_daemon
# version = 3            # 1-3

[startup]
# poll_interval_ms = 200 # 10-60000
# max_attempts = 0       # 0 = keep polling forever
# timeout_secs = 0       # 0 = no deadline

[capabilities]
# Overrides merged over the platform defaults.
# supports_app_whitelist = false
# supports_prc_whitelist = true
# supports_proxy_conf = true
# supports_listen_all = true
# supports_vpn_conf = false
# supports_autoupdate = true

[platform]
# Overrides for the native platform descriptor (detected when unset).
# type = "Linux"
# details = "Ubuntu 24.04"

[logging]
# level = "INFO"         # TRACE, DEBUG, INFO, WARNING, ERROR
"##
}
