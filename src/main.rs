//! Upstream relay binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  UPSTREAM RELAY                   │
//!   Client Request    │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!   ──────────────────┼─▶│ request  │──▶│  header    │──▶│ forwarder  │──┼──▶ Upstream
//!                     │  │ id/trace │   │  policy    │   │ (streamed) │  │    Origin
//!                     │  │  + CORS  │   └────────────┘   └─────┬──────┘  │
//!                     │  └──────────┘                         │         │
//!   Client Response   │  ┌──────────┐   ┌────────────┐         │         │
//!   ◀─────────────────┼──│ response │◀──│  header    │◀────────┘◀────────┼─── Upstream
//!                     │  │ (or 502) │   │  relay     │                   │    Response
//!                     │  └──────────┘   └────────────┘                   │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use upstream_relay::config::{resolve_config, Overrides};
use upstream_relay::lifecycle::{signals, Shutdown};
use upstream_relay::observability::{logging, metrics};
use upstream_relay::HttpServer;

#[derive(Parser)]
#[command(name = "upstream-relay")]
#[command(about = "Streaming reverse relay for a single upstream origin", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long, env = "RELAY_BIND")]
    bind: Option<String>,

    /// Override `upstream.url`.
    #[arg(short, long, env = "RELAY_UPSTREAM")]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(
        cli.config.as_deref(),
        Overrides {
            bind_address: cli.bind,
            upstream_url: cli.upstream,
        },
    )?;

    logging::init(&config.observability)?;

    tracing::info!("upstream-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        request_timeout_secs = ?config.timeouts.request_secs,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
