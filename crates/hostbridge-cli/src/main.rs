mod cli;
mod commands;
mod stdio;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use hostbridge_common::BridgeError;
use hostbridge_config::BridgeConfig;
use hostbridge_gateway::{CapabilityGateway, GatewayOptions};
use hostbridge_rpc::CallCorrelator;
use serde_json::Value;
use tokio::io::BufReader;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::Command;
use crate::stdio::LineTransport;

fn main() -> ExitCode {
    let args = cli::parse();

    // Config before logging so its level can seed the filter.
    let loaded = match &args.config {
        Some(path) => hostbridge_config::load_config_from(path),
        None => hostbridge_config::load_config(),
    };

    let log_directive = args.log_level.clone().unwrap_or_else(|| {
        loaded
            .as_ref()
            .map(|c| c.logging.level.as_directive())
            .unwrap_or("info")
            .to_string()
    });
    init_logging(&log_directive);

    tracing::info!("hostbridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        BridgeConfig::default()
    });

    // No host is attached for show-config, so stdout is free.
    if args.command == Command::ShowConfig {
        return match write_config(&mut std::io::stdout().lock(), &config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Failed to print config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(args.command, config));
    // Stdin reads park a blocking thread; don't wait for it.
    runtime.shutdown_background();

    match outcome {
        Ok(output) => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string())
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e.display_message());
            ExitCode::FAILURE
        }
    }
}

fn write_config(out: &mut impl Write, config: &BridgeConfig) -> std::io::Result<()> {
    writeln!(out, "{}", hostbridge_config::config_to_json(config))?;
    out.flush()
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();
}

async fn run(command: Command, config: BridgeConfig) -> Result<Value, BridgeError> {
    let options = GatewayOptions::from_config(&config)?;

    let correlator = Arc::new(CallCorrelator::new(Arc::new(LineTransport::stdout())));
    let pump = tokio::spawn(stdio::pump_invocations(
        BufReader::new(tokio::io::stdin()),
        Arc::clone(&correlator),
    ));

    let query_host = matches!(command, Command::Capabilities { query_host: true });
    let gateway = if query_host {
        CapabilityGateway::with_host_capabilities(correlator.clone(), options).await?
    } else {
        CapabilityGateway::new(correlator.clone(), options)
    };

    let result = commands::execute(&gateway, command).await;
    pump.abort();
    result
}
