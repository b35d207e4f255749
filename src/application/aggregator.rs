//! Market overview aggregator
//!
//! Owns the four calculators and the snapshot store. Global metrics resolve
//! first since rotation and sentiment estimates read them. Rotation runs
//! concurrently with net flow, and sentiment follows net flow so its
//! estimate can reuse the reference-asset momentum already fetched there.
//! Any cache mutation is merged into the persisted snapshot and written out.

use crate::application::indicators::{
    GlobalMetricsCalculator, NetFlowCalculator, Resolved, RotationIndexCalculator,
    SentimentIndexCalculator, global_metrics, net_flow, rotation_index, sentiment_index,
};
use crate::config::CacheEnvConfig;
use crate::domain::cache::{CacheEntry, CacheSnapshot};
use crate::domain::indicators::{DataSource, MarketOverview, NetFlowEstimate, Sourced};
use crate::domain::ports::{Clock, MarketDataProvider, SnapshotStore};
use crate::domain::refresh::{RefreshPolicy, TimeOfDayRange};
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Refresh policies and basket parameters for every calculator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub reference_asset: String,
    pub rotation_basket_size: usize,
    pub global_policy: RefreshPolicy,
    pub rotation_policy: RefreshPolicy,
    pub sentiment_policy: RefreshPolicy,
    pub netflow_policy: RefreshPolicy,
}

impl AggregatorSettings {
    pub fn from_config(config: &CacheEnvConfig) -> Self {
        Self {
            reference_asset: config.reference_asset.clone(),
            rotation_basket_size: config.rotation_basket_size,
            global_policy: config.global_policy(),
            rotation_policy: config.rotation_policy(),
            sentiment_policy: config.sentiment_policy(),
            netflow_policy: config.netflow_policy(),
        }
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            reference_asset: "BTC".to_string(),
            rotation_basket_size: 50,
            global_policy: RefreshPolicy::every(TimeDelta::hours(1)),
            rotation_policy: RefreshPolicy::every(TimeDelta::hours(12))
                .within(TimeOfDayRange::DAYTIME),
            sentiment_policy: RefreshPolicy::every(TimeDelta::hours(1)),
            netflow_policy: RefreshPolicy::every(TimeDelta::minutes(5)),
        }
    }
}

pub struct MarketAggregator {
    global: GlobalMetricsCalculator,
    rotation: RotationIndexCalculator,
    sentiment: SentimentIndexCalculator,
    net_flow: NetFlowCalculator,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    reference_asset: String,
    /// Last snapshot handed to the store. Writers merge into it under this
    /// lock and never touch the calculators' entry locks.
    persisted: Mutex<CacheSnapshot>,
}

impl MarketAggregator {
    /// Rehydrates every calculator from the store. An unreadable snapshot
    /// is logged and treated as a cold start.
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        settings: AggregatorSettings,
    ) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => {
                info!("Restored cache snapshot");
                snapshot
            }
            Ok(None) => {
                info!("No cache snapshot found, starting cold");
                CacheSnapshot::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable cache snapshot: {}", e);
                CacheSnapshot::default()
            }
        };

        Self {
            global: GlobalMetricsCalculator::new(
                provider.clone(),
                settings.global_policy,
                CacheSnapshot::restore(snapshot.global_metrics.clone()),
            ),
            rotation: RotationIndexCalculator::new(
                provider.clone(),
                settings.rotation_policy,
                CacheSnapshot::restore(snapshot.rotation_index.clone()),
                settings.reference_asset.clone(),
                settings.rotation_basket_size,
            ),
            sentiment: SentimentIndexCalculator::new(
                provider.clone(),
                settings.sentiment_policy,
                CacheSnapshot::restore(snapshot.sentiment_index.clone()),
                settings.reference_asset.clone(),
            ),
            net_flow: NetFlowCalculator::new(
                provider,
                settings.netflow_policy,
                CacheSnapshot::restore(snapshot.net_flow_estimate.clone()),
            ),
            store,
            clock,
            metrics,
            reference_asset: settings.reference_asset,
            persisted: Mutex::new(snapshot),
        }
    }

    /// Always returns a complete overview; each field degrades on its own.
    pub async fn get_overview(&self) -> MarketOverview {
        let now = self.clock.now();

        let global = self.global.get(now).await;
        // The zero placeholder carries no information for the estimates
        let global_input = match global.value.source {
            DataSource::Placeholder => None,
            _ => Some(&global.value.data),
        };

        let (rotation, (net_flow, sentiment)) = tokio::join!(
            self.rotation.get(now, global_input),
            async {
                let net_flow = self.net_flow.get(now).await;
                let change = reference_change(&net_flow.value, &self.reference_asset);
                let sentiment = self.sentiment.get(now, global_input, change).await;
                (net_flow, sentiment)
            },
        );

        if global.mutated || rotation.mutated || sentiment.mutated || net_flow.mutated {
            let mut snapshot = self.persisted.lock().await;
            CacheSnapshot::merge_newer(&mut snapshot.global_metrics, refreshed(&global, now), now);
            CacheSnapshot::merge_newer(&mut snapshot.rotation_index, refreshed(&rotation, now), now);
            CacheSnapshot::merge_newer(&mut snapshot.sentiment_index, refreshed(&sentiment, now), now);
            CacheSnapshot::merge_newer(
                &mut snapshot.net_flow_estimate,
                refreshed(&net_flow, now),
                now,
            );
            self.persist(&snapshot);
        }

        self.record_resolution(global_metrics::NAME, global.value.source);
        self.record_resolution(rotation_index::NAME, rotation.value.source);
        self.record_resolution(sentiment_index::NAME, sentiment.value.source);
        self.record_resolution(net_flow::NAME, net_flow.value.source);
        self.metrics.rotation_index.set(rotation.value.data.value as f64);
        self.metrics.sentiment_index.set(sentiment.value.data.value as f64);

        MarketOverview {
            global_metrics: global.value,
            rotation_index: rotation.value,
            sentiment_index: sentiment.value,
            net_flow_estimate: net_flow.value,
            generated_at: now,
        }
    }

    /// The snapshot as last handed to the store.
    pub async fn snapshot(&self) -> CacheSnapshot {
        self.persisted.lock().await.clone()
    }

    /// Best effort: a failed write is logged and counted, never surfaced.
    fn persist(&self, snapshot: &CacheSnapshot) {
        match self.store.save(snapshot) {
            Ok(()) => {
                debug!("Cache snapshot written");
                self.metrics.inc_snapshot_write("ok");
            }
            Err(e) => {
                error!("Cache snapshot write failed, continuing in memory: {}", e);
                self.metrics.inc_snapshot_write("failed");
            }
        }
    }

    fn record_resolution(&self, indicator: &str, source: DataSource) {
        self.metrics.inc_resolution(indicator, &source.to_string());
    }
}

/// Entry written by this call, empty when the calculator did not refresh.
fn refreshed<T: Clone>(resolved: &Resolved<T>, now: DateTime<Utc>) -> CacheEntry<T> {
    if !resolved.mutated {
        return CacheEntry::empty();
    }
    CacheEntry::fresh(resolved.value.data.clone(), resolved.value.as_of.unwrap_or(now))
}

/// Reference-asset 24h move from upstream-backed flow data only.
fn reference_change(flows: &Sourced<NetFlowEstimate>, reference_asset: &str) -> Option<f64> {
    match flows.source {
        DataSource::Live | DataSource::Cached => flows
            .data
            .per_asset_percent_change
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(reference_asset))
            .map(|c| c.change_24h_pct),
        _ => None,
    }
}
