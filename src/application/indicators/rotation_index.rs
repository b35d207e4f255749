//! Rotation index
//!
//! Share of a ranked peer basket whose trailing-90-day return beats the
//! reference asset. Ladder: live listing, cached value, estimate from the
//! reference asset's dominance, fixed neutral constant.

use super::Resolved;
use super::history::approximate_history;
use super::slot::CacheSlot;
use crate::domain::cache::CacheEntry;
use crate::domain::errors::UpstreamError;
use crate::domain::indicators::{DataSource, IndexHistory, RotationIndex, Sourced, YearlyRange};
use crate::domain::market::{GlobalMetrics, RankedAsset};
use crate::domain::ports::MarketDataProvider;
use crate::domain::refresh::RefreshPolicy;
use crate::infrastructure::upstream::coinmarketcap::LISTINGS_ENDPOINT;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const NAME: &str = "rotation_index";

/// Served when neither live, cached nor dominance data exists.
pub const NEUTRAL_ROTATION_INDEX: u8 = 25;

/// Strictly above this the market is in a rotation phase.
pub const ROTATION_PHASE_THRESHOLD: u8 = 75;

const PEGGED_SYMBOLS: &[&str] = &[
    "USDT", "USDC", "DAI", "FDUSD", "TUSD", "USDE", "USDS", "PYUSD", "USDD", "BUSD", "USDP",
    "GUSD", "FRAX", "USD1", "EURC", "PAXG", "XAUT",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationBreakdown {
    pub reference_change: f64,
    pub outperformers: usize,
    pub valid_peers: usize,
    pub value: u8,
}

/// Stablecoins and asset-pegged tokens never join the peer basket.
pub fn is_pegged(asset: &RankedAsset) -> bool {
    PEGGED_SYMBOLS.contains(&asset.symbol.to_uppercase().as_str())
        || asset
            .tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case("stablecoin") || t.eq_ignore_ascii_case("asset-backed-stablecoin"))
}

/// `round(100 * outperformers / max(1, valid_peers))`.
///
/// Peers without a finite 90-day change are excluded from both numerator
/// and denominator. `None` when the reference asset or its change is missing.
pub fn compute_rotation(assets: &[RankedAsset], reference: &str) -> Option<RotationBreakdown> {
    let reference_change = assets
        .iter()
        .find(|a| a.symbol.eq_ignore_ascii_case(reference))
        .and_then(|a| a.percent_change_90d)
        .filter(|c| c.is_finite())?;

    let valid_changes: Vec<f64> = assets
        .iter()
        .filter(|a| !a.symbol.eq_ignore_ascii_case(reference) && !is_pegged(a))
        .filter_map(|a| a.percent_change_90d)
        .filter(|c| c.is_finite())
        .collect();

    let valid_peers = valid_changes.len();
    let outperformers = valid_changes
        .iter()
        .filter(|change| **change > reference_change)
        .count();

    let value = (100.0 * outperformers as f64 / valid_peers.max(1) as f64).round() as u8;

    Some(RotationBreakdown {
        reference_change,
        outperformers,
        valid_peers,
        value,
    })
}

/// `clamp(0, 100, 100 - dominance)`
pub fn estimate_from_dominance(dominance_pct: f64) -> Option<u8> {
    if !dominance_pct.is_finite() {
        return None;
    }
    Some((100.0 - dominance_pct).clamp(0.0, 100.0).round() as u8)
}

pub fn describe(value: u8) -> &'static str {
    if value > ROTATION_PHASE_THRESHOLD {
        "Altcoin season"
    } else if value <= NEUTRAL_ROTATION_INDEX {
        "Bitcoin season"
    } else {
        "Mixed market"
    }
}

fn with_approximate_history(value: u8, description: String, today: NaiveDate) -> RotationIndex {
    let (historical, yearly) = approximate_history(&mut rand::rng(), value, today);
    RotationIndex {
        value,
        is_in_rotation_phase: value > ROTATION_PHASE_THRESHOLD,
        description,
        historical,
        yearly,
        history_is_approximate: true,
    }
}

fn neutral(today: NaiveDate) -> RotationIndex {
    let value = NEUTRAL_ROTATION_INDEX;
    RotationIndex {
        value,
        is_in_rotation_phase: false,
        description: "estimated".to_string(),
        historical: IndexHistory {
            yesterday: value,
            last_week: value,
            last_month: value,
        },
        yearly: YearlyRange::flat(value, today),
        history_is_approximate: true,
    }
}

pub struct RotationIndexCalculator {
    provider: Arc<dyn MarketDataProvider>,
    slot: CacheSlot<RotationIndex>,
    reference_asset: String,
    basket_size: usize,
}

impl RotationIndexCalculator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        policy: RefreshPolicy,
        entry: CacheEntry<RotationIndex>,
        reference_asset: String,
        basket_size: usize,
    ) -> Self {
        Self {
            provider,
            slot: CacheSlot::new(NAME, policy, entry),
            reference_asset,
            basket_size,
        }
    }

    async fn fetch_live(&self, today: NaiveDate) -> Result<RotationIndex, UpstreamError> {
        let assets = self.provider.fetch_ranked_assets(self.basket_size).await?;
        let breakdown = compute_rotation(&assets, &self.reference_asset).ok_or_else(|| {
            UpstreamError::malformed(
                LISTINGS_ENDPOINT,
                format!("no 90d change for reference asset {}", self.reference_asset),
            )
        })?;

        info!(
            "{}: {} of {} valid peers beat {} ({:+.2}%) -> {}",
            NAME,
            breakdown.outperformers,
            breakdown.valid_peers,
            self.reference_asset,
            breakdown.reference_change,
            breakdown.value
        );

        Ok(with_approximate_history(
            breakdown.value,
            describe(breakdown.value).to_string(),
            today,
        ))
    }

    fn estimate(&self, global: Option<&GlobalMetrics>, today: NaiveDate) -> Option<RotationIndex> {
        let dominance = global.and_then(|g| g.dominance_of(&self.reference_asset))?;
        let value = estimate_from_dominance(dominance)?;
        warn!(
            "{}: estimating from {} dominance {:.2}% -> {}",
            NAME, self.reference_asset, dominance, value
        );
        Some(with_approximate_history(
            value,
            format!("estimated from {} dominance", self.reference_asset),
            today,
        ))
    }

    /// `global` supplies the dominance figure for the estimate tier; pass
    /// `None` when only the zero placeholder is available.
    pub async fn get(&self, now: DateTime<Utc>, global: Option<&GlobalMetrics>) -> Resolved<RotationIndex> {
        let today = now.date_naive();
        let mut read = self.slot.refresh_with(now, || self.fetch_live(today)).await;

        if let Some(failure) = &read.failure {
            warn!("{}: upstream failed ({}), degrading", NAME, failure);
        }

        let value = read
            .live_value(now)
            .or_else(|| read.cached_value())
            .or_else(|| {
                self.estimate(global, today)
                    .map(|index| Sourced::new(DataSource::Estimated, None, index))
            })
            .unwrap_or_else(|| {
                warn!("{}: no dominance data, serving neutral constant", NAME);
                Sourced::new(DataSource::Estimated, None, neutral(today))
            });

        Resolved {
            value,
            mutated: read.mutated,
        }
    }

    pub async fn entry(&self) -> CacheEntry<RotationIndex> {
        self.slot.entry().await
    }
}
