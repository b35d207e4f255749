//! CoinMarketCap Pro API
//!
//! Global totals and the ranked listing with 90-day changes. Authenticated
//! with a static key header.

use crate::domain::errors::UpstreamError;
use crate::domain::market::{CategoryTotal, GlobalMetrics, RankedAsset};
use crate::infrastructure::core::http_client_factory::fetch_json;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
pub const GLOBAL_METRICS_ENDPOINT: &str = "global-metrics";
pub const LISTINGS_ENDPOINT: &str = "listings";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    btc_dominance: f64,
    eth_dominance: f64,
    defi_market_cap: Option<f64>,
    defi_24h_percentage_change: Option<f64>,
    stablecoin_market_cap: Option<f64>,
    stablecoin_24h_percentage_change: Option<f64>,
    quote: HashMap<String, GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    total_market_cap: f64,
    total_volume_24h: f64,
    total_market_cap_yesterday_percentage_change: Option<f64>,
    total_volume_24h_yesterday_percentage_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    name: String,
    symbol: String,
    cmc_rank: u32,
    #[serde(default)]
    tags: Vec<String>,
    quote: HashMap<String, ListingQuote>,
}

#[derive(Debug, Deserialize)]
struct ListingQuote {
    price: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_90d: Option<f64>,
}

pub struct CoinMarketCapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CoinMarketCapClient {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, UpstreamError> {
        let url = format!("{}/v1/global-metrics/quotes/latest", self.base_url);
        debug!("CoinMarketCap: GET {}", url);

        let request = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("convert", "USD")]);

        let body: Envelope<GlobalData> = fetch_json(GLOBAL_METRICS_ENDPOINT, request).await?;
        map_global_metrics(body.data)
    }

    pub async fn fetch_listings(&self, limit: usize) -> Result<Vec<RankedAsset>, UpstreamError> {
        let url = format!("{}/v1/cryptocurrency/listings/latest", self.base_url);
        debug!("CoinMarketCap: GET {} (limit={})", url, limit);

        let limit = limit.to_string();
        let request = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("start", "1"),
                ("limit", limit.as_str()),
                ("convert", "USD"),
                ("sort", "market_cap"),
            ]);

        let body: Envelope<Vec<ListingData>> = fetch_json(LISTINGS_ENDPOINT, request).await?;
        Ok(body.data.into_iter().map(map_listing).collect())
    }
}

fn map_global_metrics(data: GlobalData) -> Result<GlobalMetrics, UpstreamError> {
    let quote = data
        .quote
        .get("USD")
        .ok_or_else(|| UpstreamError::malformed(GLOBAL_METRICS_ENDPOINT, "missing USD quote"))?;

    let mut categories = Vec::new();
    if let Some(market_cap) = data.defi_market_cap {
        categories.push(CategoryTotal {
            name: "DeFi".to_string(),
            market_cap,
            change_24h_pct: data.defi_24h_percentage_change.unwrap_or(0.0),
        });
    }
    if let Some(market_cap) = data.stablecoin_market_cap {
        categories.push(CategoryTotal {
            name: "Stablecoins".to_string(),
            market_cap,
            change_24h_pct: data.stablecoin_24h_percentage_change.unwrap_or(0.0),
        });
    }

    Ok(GlobalMetrics {
        total_market_cap: quote.total_market_cap,
        total_volume_24h: quote.total_volume_24h,
        market_cap_change_24h_pct: quote.total_market_cap_yesterday_percentage_change.unwrap_or(0.0),
        volume_change_24h_pct: quote.total_volume_24h_yesterday_percentage_change.unwrap_or(0.0),
        btc_dominance: data.btc_dominance,
        eth_dominance: data.eth_dominance,
        categories,
    })
}

fn map_listing(data: ListingData) -> RankedAsset {
    let usd = data.quote.get("USD");
    RankedAsset {
        symbol: data.symbol,
        name: data.name,
        rank: data.cmc_rank,
        price: usd.and_then(|q| q.price).unwrap_or(0.0),
        percent_change_24h: usd.and_then(|q| q.percent_change_24h),
        percent_change_90d: usd.and_then(|q| q.percent_change_90d),
        tags: data.tags,
    }
}
