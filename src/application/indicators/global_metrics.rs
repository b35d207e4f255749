use super::Resolved;
use super::slot::CacheSlot;
use crate::domain::cache::CacheEntry;
use crate::domain::indicators::{DataSource, Sourced};
use crate::domain::market::GlobalMetrics;
use crate::domain::ports::MarketDataProvider;
use crate::domain::refresh::RefreshPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

pub const NAME: &str = "global_metrics";

/// Global totals: live, then last known good, then the zero placeholder.
/// There is no cheap approximation of global totals, so no estimate tier.
pub struct GlobalMetricsCalculator {
    provider: Arc<dyn MarketDataProvider>,
    slot: CacheSlot<GlobalMetrics>,
}

impl GlobalMetricsCalculator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        policy: RefreshPolicy,
        entry: CacheEntry<GlobalMetrics>,
    ) -> Self {
        Self {
            provider,
            slot: CacheSlot::new(NAME, policy, entry),
        }
    }

    pub async fn get(&self, now: DateTime<Utc>) -> Resolved<GlobalMetrics> {
        let mut read = self
            .slot
            .refresh_with(now, || self.provider.fetch_global_metrics())
            .await;

        if let Some(failure) = &read.failure {
            warn!("{}: upstream failed ({}), degrading", NAME, failure);
        }

        let value = read
            .live_value(now)
            .or_else(|| read.cached_value())
            .unwrap_or_else(|| {
                warn!("{}: no cached totals, serving zero placeholder", NAME);
                Sourced::new(DataSource::Placeholder, None, GlobalMetrics::default())
            });

        Resolved {
            value,
            mutated: read.mutated,
        }
    }

    pub async fn entry(&self) -> CacheEntry<GlobalMetrics> {
        self.slot.entry().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::{MockMarketDataProvider, sample_global_metrics};
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_live_fetch_is_stored() {
        let mock = MockMarketDataProvider::sample();
        let calc = GlobalMetricsCalculator::new(
            Arc::new(mock.clone()),
            RefreshPolicy::every(TimeDelta::hours(1)),
            CacheEntry::empty(),
        );

        let resolved = calc.get(now()).await;
        assert_eq!(resolved.value.source, DataSource::Live);
        assert!(resolved.mutated);
        assert_eq!(calc.entry().await.last_fetched_at(), Some(now()));
    }

    #[tokio::test]
    async fn test_failure_serves_cache_unchanged() {
        let fetched_at = now() - TimeDelta::hours(3);
        let calc = GlobalMetricsCalculator::new(
            Arc::new(MockMarketDataProvider::failing()),
            RefreshPolicy::every(TimeDelta::hours(1)),
            CacheEntry::fresh(sample_global_metrics(), fetched_at),
        );

        let resolved = calc.get(now()).await;
        assert_eq!(resolved.value.source, DataSource::Cached);
        assert_eq!(resolved.value.data, sample_global_metrics());
        assert_eq!(resolved.value.as_of, Some(fetched_at));
        assert!(!resolved.mutated);
        assert_eq!(calc.entry().await.last_fetched_at(), Some(fetched_at));
    }

    #[tokio::test]
    async fn test_cold_failure_serves_placeholder() {
        let calc = GlobalMetricsCalculator::new(
            Arc::new(MockMarketDataProvider::failing()),
            RefreshPolicy::every(TimeDelta::hours(1)),
            CacheEntry::empty(),
        );

        let resolved = calc.get(now()).await;
        assert_eq!(resolved.value.source, DataSource::Placeholder);
        assert!(resolved.value.data.is_placeholder());
        assert!(calc.entry().await.is_empty());
    }
}
