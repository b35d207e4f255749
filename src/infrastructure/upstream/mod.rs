//! Upstream market-data client
//!
//! Thin wrappers over the external sources:
//! - CoinMarketCap: global totals and ranked listings (API key)
//! - Alternative.me: Fear & Greed history
//! - Binance: public 24h tickers
//!
//! No caching and no retries live here; each call is bounded by the client
//! timeout and classified into an `UpstreamError`.

pub mod alternative_me;
pub mod binance;
pub mod coinmarketcap;
pub mod health;

use crate::config::UpstreamEnvConfig;
use crate::domain::errors::UpstreamError;
use crate::domain::market::{AssetTicker, GlobalMetrics, RankedAsset, SentimentPoint};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use crate::infrastructure::observability::Metrics;
use alternative_me::{AlternativeMeClient, SENTIMENT_ENDPOINT};
use async_trait::async_trait;
use binance::{BinanceTickerClient, TICKER_ENDPOINT};
use coinmarketcap::{CoinMarketCapClient, GLOBAL_METRICS_ENDPOINT, LISTINGS_ENDPOINT};
use health::UpstreamHealth;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

const SOURCE_CMC: &str = "coinmarketcap";
const SOURCE_FNG: &str = "alternative.me";
const SOURCE_BINANCE: &str = "binance";

pub struct UpstreamClient {
    cmc: CoinMarketCapClient,
    fng: AlternativeMeClient,
    binance: BinanceTickerClient,
    health: UpstreamHealth,
    metrics: Metrics,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamEnvConfig, metrics: Metrics) -> Self {
        if config.cmc_api_key.is_empty() {
            warn!("CMC_API_KEY is not set: global metrics and rotation index will degrade to fallbacks");
        }

        let client = HttpClientFactory::create_client(Duration::from_secs(config.timeout_secs));

        Self {
            cmc: CoinMarketCapClient::new(
                client.clone(),
                config.cmc_base_url.clone(),
                config.cmc_api_key.clone(),
            ),
            fng: AlternativeMeClient::new(client.clone(), config.fng_base_url.clone()),
            binance: BinanceTickerClient::new(client, config.binance_base_url.clone()),
            health: UpstreamHealth::new(config.unauthorized_alarm_threshold),
            metrics,
        }
    }

    pub fn health(&self) -> &UpstreamHealth {
        &self.health
    }

    async fn observe<T, F>(&self, source: &str, endpoint: &str, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let started = Instant::now();
        let result = call.await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics
            .observe_upstream(endpoint, outcome, started.elapsed().as_secs_f64());
        self.health.record(source, &result);
        result
    }
}

#[async_trait]
impl MarketDataProvider for UpstreamClient {
    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, UpstreamError> {
        self.observe(SOURCE_CMC, GLOBAL_METRICS_ENDPOINT, self.cmc.fetch_global_metrics())
            .await
    }

    async fn fetch_ranked_assets(&self, limit: usize) -> Result<Vec<RankedAsset>, UpstreamError> {
        self.observe(SOURCE_CMC, LISTINGS_ENDPOINT, self.cmc.fetch_listings(limit))
            .await
    }

    async fn fetch_sentiment_history(
        &self,
        days: usize,
    ) -> Result<Vec<SentimentPoint>, UpstreamError> {
        self.observe(SOURCE_FNG, SENTIMENT_ENDPOINT, self.fng.fetch_history(days))
            .await
    }

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<AssetTicker>, UpstreamError> {
        self.observe(SOURCE_BINANCE, TICKER_ENDPOINT, self.binance.fetch_tickers(symbols))
            .await
    }
}
