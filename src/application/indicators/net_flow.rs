//! Net-flow estimate
//!
//! No upstream publishes fund flows. The figure is a linear formula over
//! two reference assets' 24h change and volume, so every tier is labelled
//! an estimate.

use super::Resolved;
use super::slot::CacheSlot;
use crate::domain::cache::CacheEntry;
use crate::domain::errors::UpstreamError;
use crate::domain::indicators::{AssetChange, AssetFlow, DataSource, NetFlowEstimate, Sourced};
use crate::domain::market::AssetTicker;
use crate::domain::ports::MarketDataProvider;
use crate::domain::refresh::RefreshPolicy;
use crate::infrastructure::upstream::binance::TICKER_ENDPOINT;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "net_flow_estimate";

/// Formula parameters for one reference asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    pub symbol: &'static str,
    /// Millions of USD per percent of 24h change.
    pub weight: f64,
    /// 24h quote volume (USD) above which the bonus is added, else subtracted.
    pub volume_threshold: f64,
    pub bonus: f64,
}

pub const FLOW_PARAMS: [FlowParams; 2] = [
    FlowParams {
        symbol: "BTC",
        weight: 50.0,
        volume_threshold: 2.0e9,
        bonus: 100.0,
    },
    FlowParams {
        symbol: "ETH",
        weight: 30.0,
        volume_threshold: 1.0e9,
        bonus: 50.0,
    },
];

/// `round(change * weight + (volume > threshold ? bonus : -bonus))`
pub fn asset_flow(params: &FlowParams, ticker: &AssetTicker) -> i64 {
    let bonus = if ticker.quote_volume_24h > params.volume_threshold {
        params.bonus
    } else {
        -params.bonus
    };
    (ticker.change_24h_pct * params.weight + bonus).round() as i64
}

/// Applies the formula to every reference asset present in `tickers`.
/// `None` when none of them is.
pub fn estimate_flows(params: &[FlowParams], tickers: &[AssetTicker]) -> Option<NetFlowEstimate> {
    let matched: Vec<(&FlowParams, &AssetTicker)> = params
        .iter()
        .filter_map(|p| {
            tickers
                .iter()
                .find(|t| t.symbol.eq_ignore_ascii_case(p.symbol))
                .map(|t| (p, t))
        })
        .collect();

    if matched.is_empty() {
        return None;
    }

    let per_asset_breakdown: Vec<AssetFlow> = matched
        .iter()
        .map(|(p, t)| AssetFlow {
            symbol: p.symbol.to_string(),
            flow: asset_flow(p, t),
        })
        .collect();

    let per_asset_percent_change = matched
        .iter()
        .map(|(p, t)| AssetChange {
            symbol: p.symbol.to_string(),
            price: t.price,
            change_24h_pct: t.change_24h_pct,
        })
        .collect();

    Some(NetFlowEstimate {
        total: per_asset_breakdown.iter().map(|f| f.flow).sum(),
        per_asset_breakdown,
        per_asset_percent_change,
        is_estimate: true,
    })
}

pub struct NetFlowCalculator {
    provider: Arc<dyn MarketDataProvider>,
    slot: CacheSlot<NetFlowEstimate>,
    symbols: Vec<String>,
}

impl NetFlowCalculator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        policy: RefreshPolicy,
        entry: CacheEntry<NetFlowEstimate>,
    ) -> Self {
        Self {
            provider,
            slot: CacheSlot::new(NAME, policy, entry),
            symbols: FLOW_PARAMS.iter().map(|p| p.symbol.to_string()).collect(),
        }
    }

    async fn fetch_live(&self) -> Result<NetFlowEstimate, UpstreamError> {
        let tickers = self.provider.fetch_tickers(&self.symbols).await?;
        let estimate = estimate_flows(&FLOW_PARAMS, &tickers).ok_or_else(|| {
            UpstreamError::malformed(TICKER_ENDPOINT, "no ticker for any reference asset")
        })?;
        debug!("{}: total {} ({:?})", NAME, estimate.total, estimate.per_asset_breakdown);
        Ok(estimate)
    }

    pub async fn get(&self, now: DateTime<Utc>) -> Resolved<NetFlowEstimate> {
        let mut read = self.slot.refresh_with(now, || self.fetch_live()).await;

        if let Some(failure) = &read.failure {
            warn!("{}: upstream failed ({}), degrading", NAME, failure);
        }

        let value = read
            .live_value(now)
            .or_else(|| read.cached_value())
            .unwrap_or_else(|| {
                warn!("{}: no ticker data, serving zero estimate", NAME);
                Sourced::new(DataSource::Placeholder, None, NetFlowEstimate::zero())
            });

        Resolved {
            value,
            mutated: read.mutated,
        }
    }

    pub async fn entry(&self) -> CacheEntry<NetFlowEstimate> {
        self.slot.entry().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockMarketDataProvider;
    use chrono::{TimeDelta, TimeZone};

    fn ticker(symbol: &str, change: f64, volume: f64) -> AssetTicker {
        AssetTicker {
            symbol: symbol.to_string(),
            price: 1.0,
            change_24h_pct: change,
            quote_volume_24h: volume,
        }
    }

    #[test]
    fn test_formula_applies_bonus_by_volume() {
        // BTC: 2.0 * 50 + 100 = 200; ETH: -1.5 * 30 - 50 = -95
        let tickers = vec![ticker("BTC", 2.0, 3.0e9), ticker("ETH", -1.5, 0.5e9)];
        let estimate = estimate_flows(&FLOW_PARAMS, &tickers).unwrap();

        assert_eq!(estimate.per_asset_breakdown[0].flow, 200);
        assert_eq!(estimate.per_asset_breakdown[1].flow, -95);
        assert_eq!(estimate.total, 105);
        assert!(estimate.is_estimate);
        assert_eq!(estimate.per_asset_percent_change[1].change_24h_pct, -1.5);
    }

    #[test]
    fn test_volume_at_threshold_subtracts_bonus() {
        assert_eq!(asset_flow(&FLOW_PARAMS[0], &ticker("BTC", 0.0, 2.0e9)), -100);
    }

    #[test]
    fn test_partial_tickers_still_estimate() {
        let estimate = estimate_flows(&FLOW_PARAMS, &[ticker("ETH", 1.0, 2.0e9)]).unwrap();
        assert_eq!(estimate.per_asset_breakdown.len(), 1);
        assert_eq!(estimate.total, 80);
        assert!(estimate_flows(&FLOW_PARAMS, &[ticker("SOL", 1.0, 1.0e9)]).is_none());
    }

    #[tokio::test]
    async fn test_outage_serves_zero_estimate() {
        let calc = NetFlowCalculator::new(
            Arc::new(MockMarketDataProvider::failing()),
            RefreshPolicy::every(TimeDelta::minutes(5)),
            CacheEntry::empty(),
        );

        let now = Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap();
        let resolved = calc.get(now).await;
        assert_eq!(resolved.value.source, DataSource::Placeholder);
        assert_eq!(resolved.value.data, NetFlowEstimate::zero());
        assert!(!resolved.mutated);
    }
}
