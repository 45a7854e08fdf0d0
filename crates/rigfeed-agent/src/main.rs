//! # rigfeed-agent
//!
//! Relay binary — wires settings, the state store, the dispatcher, and the
//! broadcast server together, and feeds the dispatcher from stdin.

#![deny(unsafe_code)]

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rigfeed_dispatch::TelemetryDispatcher;
use rigfeed_server::BroadcastServer;
use rigfeed_settings::{ExportMode, RigfeedSettings};
use rigfeed_state::TelemetryStore;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Telemetry state relay.
#[derive(Parser, Debug)]
#[command(name = "rigfeed-agent", about = "Telemetry state relay")]
struct Cli {
    /// Path to the settings file (defaults to rigfeed.json in the working directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to bind (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Export mode: full, delta, or devenv (overrides settings).
    #[arg(long)]
    mode: Option<String>,

    /// Session identifier stamped into every exported frame.
    #[arg(long, default_value = "eut2")]
    game: String,
}

/// Layer CLI flags over the loaded settings.
fn resolve_settings(args: &Cli) -> RigfeedSettings {
    let path = args
        .config
        .clone()
        .unwrap_or_else(rigfeed_settings::settings_path);
    let mut settings = match rigfeed_settings::load_settings_from_path(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to load settings, using defaults");
            RigfeedSettings::default()
        }
    };
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(ref mode) = args.mode {
        settings.export.mode = ExportMode::from_config(mode);
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let settings = resolve_settings(&args);
    let port = settings.server.port;
    let mode = settings.export.mode;
    rigfeed_settings::init_settings(settings);

    let server = Arc::new(BroadcastServer::new());
    // A failed bind disables observers but must not kill the producer path.
    match server.start(port).await {
        Ok(addr) => info!(%addr, "broadcast server listening"),
        Err(e) => warn!(error = %e, "broadcast server disabled"),
    }

    let store = Arc::new(TelemetryStore::new());
    let dispatcher =
        TelemetryDispatcher::new(store, Arc::clone(&server), mode, args.game.clone());
    info!(%mode, game = %args.game, "dispatcher ready");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        result = replay::run(stdin, &dispatcher) => {
            result.context("replay input failed")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("shutdown signal received");
        }
    }

    server.stop().await;
    info!("shutdown complete");
    Ok(())
}
