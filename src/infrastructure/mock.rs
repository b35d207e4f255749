use crate::domain::errors::UpstreamError;
use crate::domain::market::{AssetTicker, CategoryTotal, GlobalMetrics, RankedAsset, SentimentPoint};
use crate::domain::ports::{Clock, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted provider with per-endpoint call counters.
///
/// `sample()` serves plausible static data for `MODE=mock`; `failing()`
/// answers every call with `Unreachable`. Responses can be swapped at
/// runtime to script outages.
#[derive(Clone)]
pub struct MockMarketDataProvider {
    inner: Arc<MockState>,
}

struct MockState {
    global: Mutex<Result<GlobalMetrics, UpstreamError>>,
    ranked: Mutex<Result<Vec<RankedAsset>, UpstreamError>>,
    sentiment: Mutex<Result<Vec<SentimentPoint>, UpstreamError>>,
    tickers: Mutex<Result<Vec<AssetTicker>, UpstreamError>>,
    latency: Mutex<Option<Duration>>,
    global_calls: AtomicUsize,
    ranked_calls: AtomicUsize,
    sentiment_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
}

fn read<T: Clone>(slot: &Mutex<T>) -> T {
    match slot.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write<T>(slot: &Mutex<T>, value: T) {
    match slot.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

impl MockMarketDataProvider {
    pub fn sample() -> Self {
        Self::with_responses(
            Ok(sample_global_metrics()),
            Ok(sample_ranked_assets()),
            Ok(sample_sentiment_history()),
            Ok(sample_tickers()),
        )
    }

    pub fn failing() -> Self {
        let down = |endpoint: &str| UpstreamError::unreachable(endpoint, "mock outage");
        Self::with_responses(
            Err(down("global-metrics")),
            Err(down("listings")),
            Err(down("fear-and-greed")),
            Err(down("ticker-24hr")),
        )
    }

    pub fn with_responses(
        global: Result<GlobalMetrics, UpstreamError>,
        ranked: Result<Vec<RankedAsset>, UpstreamError>,
        sentiment: Result<Vec<SentimentPoint>, UpstreamError>,
        tickers: Result<Vec<AssetTicker>, UpstreamError>,
    ) -> Self {
        Self {
            inner: Arc::new(MockState {
                global: Mutex::new(global),
                ranked: Mutex::new(ranked),
                sentiment: Mutex::new(sentiment),
                tickers: Mutex::new(tickers),
                latency: Mutex::new(None),
                global_calls: AtomicUsize::new(0),
                ranked_calls: AtomicUsize::new(0),
                sentiment_calls: AtomicUsize::new(0),
                ticker_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Delays every response, to widen race windows in tests.
    pub fn with_latency(self, latency: Duration) -> Self {
        write(&self.inner.latency, Some(latency));
        self
    }

    pub fn set_global(&self, response: Result<GlobalMetrics, UpstreamError>) {
        write(&self.inner.global, response);
    }

    pub fn set_ranked(&self, response: Result<Vec<RankedAsset>, UpstreamError>) {
        write(&self.inner.ranked, response);
    }

    pub fn set_sentiment(&self, response: Result<Vec<SentimentPoint>, UpstreamError>) {
        write(&self.inner.sentiment, response);
    }

    pub fn set_tickers(&self, response: Result<Vec<AssetTicker>, UpstreamError>) {
        write(&self.inner.tickers, response);
    }

    pub fn global_calls(&self) -> usize {
        self.inner.global_calls.load(Ordering::SeqCst)
    }

    pub fn ranked_calls(&self) -> usize {
        self.inner.ranked_calls.load(Ordering::SeqCst)
    }

    pub fn sentiment_calls(&self) -> usize {
        self.inner.sentiment_calls.load(Ordering::SeqCst)
    }

    pub fn ticker_calls(&self) -> usize {
        self.inner.ticker_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = read(&self.inner.latency) {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, UpstreamError> {
        self.inner.global_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        read(&self.inner.global)
    }

    async fn fetch_ranked_assets(&self, limit: usize) -> Result<Vec<RankedAsset>, UpstreamError> {
        self.inner.ranked_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        read(&self.inner.ranked).map(|assets| assets.into_iter().take(limit).collect())
    }

    async fn fetch_sentiment_history(
        &self,
        days: usize,
    ) -> Result<Vec<SentimentPoint>, UpstreamError> {
        self.inner.sentiment_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        read(&self.inner.sentiment).map(|series| series.into_iter().take(days).collect())
    }

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<AssetTicker>, UpstreamError> {
        self.inner.ticker_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        read(&self.inner.tickers).map(|tickers| {
            tickers
                .into_iter()
                .filter(|t| symbols.iter().any(|s| s.eq_ignore_ascii_case(&t.symbol)))
                .collect()
        })
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        write(&self.now, now);
    }

    pub fn advance(&self, by: TimeDelta) {
        let now = read(&self.now);
        write(&self.now, now + by);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        read(&self.now)
    }
}

pub fn sample_global_metrics() -> GlobalMetrics {
    GlobalMetrics {
        total_market_cap: 3.15e12,
        total_volume_24h: 1.18e11,
        market_cap_change_24h_pct: 1.4,
        volume_change_24h_pct: -3.2,
        btc_dominance: 58.2,
        eth_dominance: 11.6,
        categories: vec![
            CategoryTotal {
                name: "DeFi".to_string(),
                market_cap: 1.02e11,
                change_24h_pct: 2.1,
            },
            CategoryTotal {
                name: "Stablecoins".to_string(),
                market_cap: 2.2e11,
                change_24h_pct: 0.05,
            },
        ],
    }
}

/// BTC first, then 49 peers with a spread of 90-day changes.
pub fn sample_ranked_assets() -> Vec<RankedAsset> {
    let mut assets = vec![RankedAsset {
        symbol: "BTC".to_string(),
        name: "Bitcoin".to_string(),
        rank: 1,
        price: 97_250.0,
        percent_change_24h: Some(0.8),
        percent_change_90d: Some(12.0),
        tags: vec!["mineable".to_string()],
    }];
    for i in 2..=50u32 {
        assets.push(RankedAsset {
            symbol: format!("ALT{}", i),
            name: format!("Altcoin {}", i),
            rank: i,
            price: 100.0 / i as f64,
            percent_change_24h: Some((i % 7) as f64 - 3.0),
            percent_change_90d: Some((i as f64 * 7.3) % 60.0 - 25.0),
            tags: Vec::new(),
        });
    }
    assets
}

pub fn sample_sentiment_history() -> Vec<SentimentPoint> {
    let today = Utc::now();
    (0..365)
        .map(|day| SentimentPoint {
            value: (50 + ((day * 37) % 41) as i64 - 20).clamp(0, 100) as u8,
            timestamp: today - TimeDelta::days(day),
        })
        .collect()
}

pub fn sample_tickers() -> Vec<AssetTicker> {
    vec![
        AssetTicker {
            symbol: "BTC".to_string(),
            price: 97_250.0,
            change_24h_pct: 0.8,
            quote_volume_24h: 2.4e9,
        },
        AssetTicker {
            symbol: "ETH".to_string(),
            price: 3_410.0,
            change_24h_pct: -1.1,
            quote_volume_24h: 1.1e9,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_calls_and_truncates() {
        let mock = MockMarketDataProvider::sample();
        let assets = mock.fetch_ranked_assets(10).await.unwrap();
        assert_eq!(assets.len(), 10);
        assert_eq!(mock.ranked_calls(), 1);
        assert_eq!(mock.global_calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_mock_is_unreachable() {
        let mock = MockMarketDataProvider::failing();
        assert!(matches!(
            mock.fetch_global_metrics().await,
            Err(UpstreamError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_clock_advances_only_on_request() {
        let start = Utc::now();
        let clock = MockClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(TimeDelta::minutes(5));
        assert_eq!(clock.now(), start + TimeDelta::minutes(5));
    }

    #[tokio::test]
    async fn test_responses_can_be_swapped() {
        let mock = MockMarketDataProvider::failing();
        mock.set_global(Ok(sample_global_metrics()));
        assert!(mock.fetch_global_metrics().await.is_ok());
    }
}
