use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cryptopulse::application::{AggregatorSettings, MarketAggregator};
use cryptopulse::domain::errors::UpstreamError;
use cryptopulse::domain::indicators::DataSource;
use cryptopulse::domain::market::{AssetTicker, GlobalMetrics, RankedAsset, SentimentPoint};
use cryptopulse::domain::ports::MarketDataProvider;
use cryptopulse::infrastructure::mock::{MockClock, MockMarketDataProvider};
use cryptopulse::infrastructure::observability::Metrics;
use cryptopulse::infrastructure::persistence::InMemorySnapshotStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

fn build(provider: Arc<dyn MarketDataProvider>, store: Arc<InMemorySnapshotStore>) -> MarketAggregator {
    let clock = MockClock::new(Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap());
    MarketAggregator::new(
        provider,
        store,
        Arc::new(clock),
        Metrics::new().unwrap(),
        AggregatorSettings::default(),
    )
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// Sample data, except that the first ranked-assets call fails, the second
/// waits for `ranked_gate`, and the first ticker call waits for `ticker_gate`.
struct GatedProvider {
    inner: MockMarketDataProvider,
    ranked_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
    ranked_gate: Notify,
    ticker_gate: Notify,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            inner: MockMarketDataProvider::sample(),
            ranked_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
            ranked_gate: Notify::new(),
            ticker_gate: Notify::new(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for GatedProvider {
    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, UpstreamError> {
        self.inner.fetch_global_metrics().await
    }

    async fn fetch_ranked_assets(&self, limit: usize) -> Result<Vec<RankedAsset>, UpstreamError> {
        match self.ranked_calls.fetch_add(1, Ordering::SeqCst) {
            0 => Err(UpstreamError::unreachable("listings", "connection reset")),
            _ => {
                self.ranked_gate.notified().await;
                self.inner.fetch_ranked_assets(limit).await
            }
        }
    }

    async fn fetch_sentiment_history(
        &self,
        days: usize,
    ) -> Result<Vec<SentimentPoint>, UpstreamError> {
        self.inner.fetch_sentiment_history(days).await
    }

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<AssetTicker>, UpstreamError> {
        if self.ticker_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.ticker_gate.notified().await;
        }
        self.inner.fetch_tickers(symbols).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch_per_endpoint() {
    // 1. Slow upstream widens the race window
    let mock = MockMarketDataProvider::sample().with_latency(Duration::from_millis(50));
    let store = Arc::new(InMemorySnapshotStore::new());
    let aggregator = Arc::new(build(Arc::new(mock.clone()), store.clone()));

    // 2. Fifty overlapping requests on a cold cache
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.get_overview().await })
        })
        .collect();

    let overviews = futures::future::join_all(handles).await;

    // 3. Every caller got a complete answer, backed by one call per endpoint
    for overview in overviews {
        let overview = overview.unwrap();
        assert!(matches!(
            overview.global_metrics.source,
            DataSource::Live | DataSource::Cached
        ));
        assert!(overview.net_flow_estimate.data.is_estimate);
    }

    assert_eq!(mock.global_calls(), 1);
    assert_eq!(mock.ranked_calls(), 1);
    assert_eq!(mock.sentiment_calls(), 1);
    assert_eq!(mock.ticker_calls(), 1);

    // One write per mutating caller at most
    assert!(store.save_count() >= 1 && store.save_count() <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_outage_burst_makes_one_attempt_per_endpoint() {
    let mock = MockMarketDataProvider::failing().with_latency(Duration::from_millis(200));
    let store = Arc::new(InMemorySnapshotStore::new());
    let aggregator = Arc::new(build(Arc::new(mock.clone()), store.clone()));

    let started = Instant::now();
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.get_overview().await })
        })
        .collect();

    for overview in futures::future::join_all(handles).await {
        let overview = overview.unwrap();
        assert_eq!(overview.global_metrics.source, DataSource::Placeholder);
        assert_eq!(overview.rotation_index.source, DataSource::Estimated);
        assert_eq!(overview.net_flow_estimate.source, DataSource::Placeholder);
    }

    // Queued callers reuse the failed attempt instead of retrying in turn
    assert_eq!(mock.global_calls(), 1);
    assert_eq!(mock.ranked_calls(), 1);
    assert_eq!(mock.sentiment_calls(), 1);
    assert_eq!(mock.ticker_calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(store.save_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_write_does_not_wait_for_another_callers_fetch() {
    let provider = Arc::new(GatedProvider::new());
    let store = Arc::new(InMemorySnapshotStore::new());
    let aggregator = Arc::new(build(provider.clone(), store.clone()));

    // 1. First caller: rotation fails fast, net flow waits on its ticker call
    let first = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.get_overview().await }
    });
    wait_until(|| {
        provider.ticker_calls.load(Ordering::SeqCst) == 1
            && provider.ranked_calls.load(Ordering::SeqCst) == 1
    })
    .await;
    // Let the failed rotation attempt release its entry
    tokio::time::sleep(Duration::from_millis(50)).await;

    // 2. Second caller retries rotation and holds that entry while it waits
    let second = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.get_overview().await }
    });
    wait_until(|| provider.ranked_calls.load(Ordering::SeqCst) == 2).await;

    // 3. First caller finishes and writes while rotation is still in flight
    provider.ticker_gate.notify_one();
    let overview = tokio::time::timeout(Duration::from_secs(1), first)
        .await
        .expect("first caller blocked on the in-flight rotation fetch")
        .unwrap();
    assert_eq!(overview.net_flow_estimate.source, DataSource::Live);
    assert_eq!(store.save_count(), 1);
    let saved = store.current().unwrap();
    assert!(saved.net_flow_estimate.is_some());
    assert!(saved.rotation_index.is_none());

    // 4. Second caller completes and merges rotation in
    provider.ranked_gate.notify_one();
    let overview = second.await.unwrap();
    assert_eq!(overview.rotation_index.source, DataSource::Live);
    let saved = store.current().unwrap();
    assert!(saved.rotation_index.is_some());
    assert!(saved.net_flow_estimate.is_some());
    assert_eq!(aggregator.snapshot().await, saved);
}
