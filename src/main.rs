//! Gym dashboard forwarding gateway
//!
//! Forwards `{prefix}/{rest}` to one configured backend origin and relays
//! the answer as JSON with CORS headers the browser dashboard relies on.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               FORWARDING GATEWAY             │
//!                        │                                              │
//!   Browser request      │  ┌─────────┐    ┌─────────┐    ┌─────────┐   │
//!   ─────────────────────┼─▶│  http   │───▶│ forward │───▶│ reqwest │───┼──▶ Backend
//!                        │  │ server  │    │         │    │ client  │   │    origin
//!                        │  └─────────┘    └─────────┘    └────┬────┘   │
//!                        │                                     │        │
//!   Browser response     │  ┌──────────┐                       │        │
//!   ◀────────────────────┼──│ response │◀──────────────────────┘        │
//!                        │  │ + CORS   │                                │
//!                        │  └──────────┘                                │
//!                        │                                              │
//!                        │  config (TOML + env, hot reload)             │
//!                        │  observability (tracing, Prometheus)         │
//!                        │  lifecycle (signals, graceful shutdown)      │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gym_gateway::config::{self, watcher::ConfigWatcher};
use gym_gateway::lifecycle::{signals, Shutdown};
use gym_gateway::observability::{logging, metrics};
use gym_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "gym-gateway")]
#[command(about = "Forwarding gateway for the gym dashboard", long_about = None)]
struct Args {
    /// TOML configuration file. Without it, defaults plus environment apply.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_from_env()?,
    };

    logging::init(&config.observability.log_level)?;
    tracing::info!("gym-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        mount_prefix = %config.upstream.mount_prefix,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    // The watcher handle has to outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = GatewayServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
