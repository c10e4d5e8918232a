use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// Host bridge: call native host capabilities over a line-delimited stdio
/// channel.
///
/// Outbound calls are written to stdout, one JSON envelope per line. The
/// host answers on stdin with one `{"callback_code", "argument"}` object per
/// line. Logs and the command's result go to stderr.
#[derive(Parser, Debug)]
#[command(name = "hostbridge", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Start the daemon and wait until it reports connected.
    StartDaemon {
        /// Daemon parameters as JSON.
        #[arg(default_value = "{}", value_parser = parse_json)]
        params: Value,
    },
    /// Stop the daemon.
    StopDaemon,
    /// Stop, then start the daemon again.
    RestartDaemon {
        #[arg(default_value = "{}", value_parser = parse_json)]
        params: Value,
    },
    /// Ask the daemon whether it is connected.
    IsConnected,
    /// Like is-connected, but never fails.
    IsRunning,
    /// Sync account data and print the subscription.
    SyncUserInfo(Login),
    /// Sync account data and print the exit list.
    SyncExits(Login),
    /// Sync with the purge flag set.
    PurgeCaches(Login),
    /// Ask the host to export its logs.
    ExportDebugPack,
    /// Call a daemon method through the nested daemon channel.
    DaemonRpc(NestedCall),
    /// Call a binder method through the nested binder channel.
    BinderRpc(NestedCall),
    /// Print the native platform descriptor.
    NativeInfo,
    /// Open a URL in the system browser.
    OpenBrowser { url: String },
    /// Set the UI conversion factor.
    SetConversionFactor { factor: f64 },
    /// Print the capability flags.
    Capabilities {
        /// Also ask the host for its own capability report.
        #[arg(long)]
        query_host: bool,
    },
    /// Call any host method.
    Invoke(NestedCall),
    /// Print the effective configuration to stdout.
    ShowConfig,
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct Login {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct NestedCall {
    pub method: String,
    /// Positional arguments. Each is parsed as JSON, falling back to a plain
    /// string.
    #[arg(value_parser = parse_json)]
    pub args: Vec<Value>,
}

/// Parse an argument as JSON; anything that isn't JSON is taken as a string.
fn parse_json(raw: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

pub fn parse() -> Args {
    Args::parse()
}
