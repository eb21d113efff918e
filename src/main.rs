//! Asset rewrite proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────┐
//!                         │                  ASSET PROXY                   │
//!                         │                                                │
//!     Client Request      │  ┌──────────┐   ┌──────────┐   ┌───────────┐   │
//!     ────────────────────┼─▶│  router  │──▶│  asset   │──▶│  forward  │───┼──▶ Origin
//!                         │  │ + layers │   │ rewrite  │   │  handler  │   │
//!                         │  └──────────┘   └────┬─────┘   └───────────┘   │
//!                         │                      │                         │
//!     Client Response     │                      ▼                         │
//!     ◀───────────────────┼──────────── HTML / JSON transformer            │
//!                         │              (URL rules, SVG inlining)         │
//!                         │                                                │
//!                         │   config + watcher │ hostname │ observability  │
//!                         └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use asset_proxy::config::{load_config, watcher::ConfigWatcher, AppConfig};
use asset_proxy::observability::{logging, metrics};
use asset_proxy::{Environment, HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "asset-proxy", version, about = "Rewrites asset URLs of proxied responses")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("asset-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.address,
        asset_path = %config.proxy.asset_path,
        site_prefixes = config.proxy.prefixes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config.clone(), Environment::from_env())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
