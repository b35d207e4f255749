use crate::domain::cache::CacheSnapshot;
use crate::domain::errors::{PersistenceError, UpstreamError};
use crate::domain::market::{AssetTicker, GlobalMetrics, RankedAsset, SentimentPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Upstream market-data endpoints. One method per endpoint, no caching or
/// retry behind it: every failure is returned as-is for the caller to degrade.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_global_metrics(&self) -> Result<GlobalMetrics, UpstreamError>;

    /// Top `limit` assets by market cap, with trailing-90-day changes.
    async fn fetch_ranked_assets(&self, limit: usize) -> Result<Vec<RankedAsset>, UpstreamError>;

    /// Daily sentiment series, newest first, at most `days` points.
    async fn fetch_sentiment_history(
        &self,
        days: usize,
    ) -> Result<Vec<SentimentPoint>, UpstreamError>;

    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<AssetTicker>, UpstreamError>;
}

/// Durable store for the full cache snapshot.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been written yet.
    fn load(&self) -> Result<Option<CacheSnapshot>, PersistenceError>;
    fn save(&self, snapshot: &CacheSnapshot) -> Result<(), PersistenceError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
