//! CryptoPulse - market indicator aggregation service
//!
//! # Usage
//! ```sh
//! MODE=mock cargo run -- serve
//! cargo run -- overview
//! ```
//!
//! Configuration is read from the environment (and `.env`); see `Config`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryptopulse::application::{AggregatorSettings, MarketAggregator};
use cryptopulse::config::{Config, Mode};
use cryptopulse::domain::ports::{MarketDataProvider, SnapshotStore, SystemClock};
use cryptopulse::infrastructure::observability::Metrics;
use cryptopulse::infrastructure::{
    InMemorySnapshotStore, JsonSnapshotStore, MockMarketDataProvider, UpstreamClient,
};
use cryptopulse::interfaces::{AppState, build_router};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "cryptopulse", version, about = "Cached, fallback-aware crypto market indicators")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the overview over HTTP
    Serve {
        /// Overrides HTTP_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print one overview as JSON and exit
    Overview,
}

fn build_aggregator(config: &Config, metrics: &Metrics) -> Arc<MarketAggregator> {
    let (provider, store): (Arc<dyn MarketDataProvider>, Arc<dyn SnapshotStore>) = match config.mode {
        Mode::Live => (
            Arc::new(UpstreamClient::new(&config.upstream, metrics.clone())),
            Arc::new(JsonSnapshotStore::new(config.cache.snapshot_path.clone())),
        ),
        Mode::Mock => (
            Arc::new(MockMarketDataProvider::sample()),
            Arc::new(InMemorySnapshotStore::new()),
        ),
    };

    Arc::new(MarketAggregator::new(
        provider,
        store,
        Arc::new(SystemClock),
        metrics.clone(),
        AggregatorSettings::from_config(&config.cache),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    info!(
        "CryptoPulse {} starting: Mode={:?}, Snapshot={}",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        config.cache.snapshot_path.display()
    );

    let metrics = Metrics::new()?;
    let aggregator = build_aggregator(&config, &metrics);

    match cli.command {
        Command::Overview => {
            let overview = aggregator.get_overview().await;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = config.server.socket_addr();
            let router = build_router(AppState {
                aggregator,
                metrics,
            });

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);

            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                    info!("Shutdown signal received. Exiting...");
                })
                .await?;
        }
    }

    Ok(())
}
