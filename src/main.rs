//! Event bridge binary.
//!
//! Serves HTTP intake and hands each request to the configured strategy.
//! In callback mode an echo handler answers every path, which makes the
//! binary a self-contained smoke test; in push/poll mode requests wait for
//! workers on the control API (see `bridge-cli`).

use clap::Parser;
use std::path::PathBuf;

use event_bridge::config::{load_config, validate_config, BridgeConfig, DispatchMode};
use event_bridge::dispatch::EchoHandler;
use event_bridge::lifecycle::signals::wait_for_signal;
use event_bridge::observability::{logging, metrics};
use event_bridge::Bridge;

#[derive(Parser)]
#[command(name = "event-bridge")]
#[command(about = "Bridge HTTP requests to an asynchronous event engine", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the dispatch mode (callback, push, poll).
    #[arg(short, long)]
    mode: Option<DispatchMode>,

    /// Override the intake bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable the control listener.
    #[arg(long)]
    control: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.dispatch.mode = mode;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if args.control {
        config.control.enabled = true;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "event-bridge starting");

    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            tracing::error!(error = %err, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mode = config.dispatch.mode;
    let bridge = Bridge::new(config);
    if mode == DispatchMode::Callback {
        bridge.register_default_handler(EchoHandler);
    }

    let addrs = bridge.start().await?;
    tracing::info!(intake = %addrs.intake, control = ?addrs.control, mode = %mode, "Ready");

    let signal = wait_for_signal().await?;
    tracing::info!(signal, "Shutdown signal received");

    let report = bridge.stop().await?;
    tracing::info!(
        drained = report.drained,
        cancelled = report.cancelled,
        "event-bridge stopped"
    );
    Ok(())
}
