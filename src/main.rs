//! Admission gate front proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                ADMISSION GATE                │
//!     Client Request       │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!     ─────────────────────┼─▶│  http    │──▶│ admission │──▶│ forward │──┼──▶ Upstream
//!                          │  │  server  │   │ middleware│   │ handler │  │    (web app)
//!                          │  └──────────┘   └─────┬─────┘   └─────────┘  │
//!                          │                       │ reject               │
//!     ◀────────────────────┼───────────────────────┘ 429 JSON             │
//!                          │                                              │
//!                          │  config · observability · lifecycle          │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use admission_gate::config::{load_config, validate_config, ConfigError, GateConfig};
use admission_gate::lifecycle::{signals, Shutdown};
use admission_gate::observability::{logging, metrics};
use admission_gate::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "admission-gate")]
#[command(about = "Fixed-window rate limiting front proxy", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Override upstream.address
    #[arg(long)]
    upstream: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

fn resolve_config(args: &Args) -> Result<GateConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(upstream) = &args.upstream {
        config.upstream.address = upstream.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability);

    tracing::info!("admission-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_path = ?args.config,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address already validated.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
