//! Binance public 24h ticker, used as a supplementary live price source.

use crate::domain::errors::UpstreamError;
use crate::domain::market::AssetTicker;
use crate::infrastructure::core::http_client_factory::fetch_json;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

pub const TICKER_ENDPOINT: &str = "ticker-24hr";
const QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Deserialize)]
struct Ticker24hr {
    symbol: String,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: String,
    #[serde(rename = "quoteVolume")]
    quote_volume: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
}

pub struct BinanceTickerClient {
    client: Client,
    base_url: String,
}

impl BinanceTickerClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches 24h tickers for base-asset symbols (`"BTC"`), quoted in USDT.
    pub async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<AssetTicker>, UpstreamError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let pairs = pair_list(symbols);
        debug!("Binance: GET {} symbols={}", url, pairs);

        let request = self.client.get(&url).query(&[("symbols", pairs.as_str())]);
        let tickers: Vec<Ticker24hr> = fetch_json(TICKER_ENDPOINT, request).await?;

        select_tickers(symbols, &tickers)
    }
}

/// Tickers for the requested symbols, in request order. Pairs the exchange
/// did not return are skipped so the caller can work with a partial set.
fn select_tickers(symbols: &[String], tickers: &[Ticker24hr]) -> Result<Vec<AssetTicker>, UpstreamError> {
    let mut selected = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let pair = format!("{}{}", symbol.to_uppercase(), QUOTE_ASSET);
        match tickers.iter().find(|t| t.symbol == pair) {
            Some(ticker) => selected.push(map_ticker(symbol, ticker)?),
            None => warn!("Binance: no ticker returned for {}", pair),
        }
    }
    Ok(selected)
}

/// JSON array form expected by the `symbols` parameter.
fn pair_list(symbols: &[String]) -> String {
    let quoted: Vec<String> = symbols
        .iter()
        .map(|s| format!("\"{}{}\"", s.to_uppercase(), QUOTE_ASSET))
        .collect();
    format!("[{}]", quoted.join(","))
}

fn map_ticker(symbol: &str, ticker: &Ticker24hr) -> Result<AssetTicker, UpstreamError> {
    let parse = |field: &str, raw: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| UpstreamError::malformed(TICKER_ENDPOINT, format!("bad {} '{}'", field, raw)))
    };

    Ok(AssetTicker {
        symbol: symbol.to_string(),
        price: parse("lastPrice", &ticker.last_price)?,
        change_24h_pct: parse("priceChangePercent", &ticker.price_change_percent)?,
        quote_volume_24h: parse("quoteVolume", &ticker.quote_volume)?,
    })
}
