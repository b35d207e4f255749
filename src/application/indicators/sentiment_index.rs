//! Sentiment index
//!
//! Ladder: live Fear & Greed series, cached value, a five-factor synthetic
//! score, and finally the "data unavailable" sentinel. Classification is
//! always recomputed from the numeric value.

use super::Resolved;
use super::history::approximate_history;
use super::slot::CacheSlot;
use crate::domain::cache::CacheEntry;
use crate::domain::errors::UpstreamError;
use crate::domain::indicators::{DataSource, IndexHistory, SentimentIndex, Sourced, YearlyRange};
use crate::domain::market::{GlobalMetrics, SentimentPoint};
use crate::domain::ports::MarketDataProvider;
use crate::domain::refresh::RefreshPolicy;
use crate::domain::sentiment::SentimentClassification;
use crate::infrastructure::upstream::alternative_me::SENTIMENT_ENDPOINT;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NAME: &str = "sentiment_index";

/// Days of history requested, enough for the yearly range.
pub const SERIES_DAYS: usize = 365;

const NEUTRAL_SCORE: f64 = 50.0;

// Momentum: percent move times weight, capped
const MOMENTUM_WEIGHT: f64 = 5.0;
const MAX_MOMENTUM_SHIFT: f64 = 25.0;

// Dominance of the reference asset, percent
const DOMINANCE_LOW: f64 = 55.0;
const DOMINANCE_HIGH: f64 = 65.0;
const DOMINANCE_SHIFT: f64 = 15.0;

// 24h volume against a fixed historical-average baseline (USD)
const VOLUME_BASELINE_USD: f64 = 100e9;
const VOLUME_BAND: f64 = 0.2;
const VOLUME_SHIFT: f64 = 10.0;

// Cyclical: weekends are quiet, the EU/US overlap is busy (UTC hours)
const WEEKEND_SHIFT: f64 = -5.0;
const ACTIVE_HOURS_SHIFT: f64 = 3.0;
const ACTIVE_HOURS_START: u32 = 13;
const ACTIVE_HOURS_END: u32 = 21;

/// Inputs for the synthetic score. `None` contributes no adjustment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentInputs {
    pub market_cap_change_24h_pct: Option<f64>,
    pub reference_change_24h_pct: Option<f64>,
    pub reference_dominance_pct: Option<f64>,
    pub total_volume_24h: Option<f64>,
}

impl SentimentInputs {
    pub fn from_global(global: Option<&GlobalMetrics>, reference: &str) -> Self {
        match global {
            Some(g) => Self {
                market_cap_change_24h_pct: Some(g.market_cap_change_24h_pct),
                reference_change_24h_pct: None,
                reference_dominance_pct: g.dominance_of(reference),
                total_volume_24h: Some(g.total_volume_24h).filter(|v| *v > 0.0),
            },
            None => Self::default(),
        }
    }

    fn all_finite(&self) -> bool {
        [
            self.market_cap_change_24h_pct,
            self.reference_change_24h_pct,
            self.reference_dominance_pct,
            self.total_volume_24h,
        ]
        .iter()
        .flatten()
        .all(|v| v.is_finite())
    }
}

/// Per-factor adjustments, each already clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentFactors {
    pub market_cap: f64,
    pub reference: f64,
    pub dominance: f64,
    pub volume: f64,
    pub cyclical: f64,
}

impl SentimentFactors {
    pub fn compute(inputs: &SentimentInputs, now: DateTime<Utc>) -> Self {
        let momentum = |change: Option<f64>| {
            change
                .map(|c| (c * MOMENTUM_WEIGHT).clamp(-MAX_MOMENTUM_SHIFT, MAX_MOMENTUM_SHIFT))
                .unwrap_or(0.0)
        };

        let dominance = match inputs.reference_dominance_pct {
            Some(d) if d < DOMINANCE_LOW => DOMINANCE_SHIFT,
            Some(d) if d > DOMINANCE_HIGH => -DOMINANCE_SHIFT,
            _ => 0.0,
        };

        let volume = match inputs.total_volume_24h {
            Some(v) if v > VOLUME_BASELINE_USD * (1.0 + VOLUME_BAND) => VOLUME_SHIFT,
            Some(v) if v < VOLUME_BASELINE_USD * (1.0 - VOLUME_BAND) => -VOLUME_SHIFT,
            _ => 0.0,
        };

        Self {
            market_cap: momentum(inputs.market_cap_change_24h_pct),
            reference: momentum(inputs.reference_change_24h_pct),
            dominance,
            volume,
            cyclical: cyclical_adjustment(now),
        }
    }

    pub fn raw_score(&self) -> f64 {
        NEUTRAL_SCORE + self.market_cap + self.reference + self.dominance + self.volume + self.cyclical
    }
}

pub fn cyclical_adjustment(now: DateTime<Utc>) -> f64 {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        WEEKEND_SHIFT
    } else if (ACTIVE_HOURS_START..ACTIVE_HOURS_END).contains(&now.hour()) {
        ACTIVE_HOURS_SHIFT
    } else {
        0.0
    }
}

/// Clamped, rounded synthetic score. `None` if any present input is not finite.
pub fn synthetic_score(inputs: &SentimentInputs, now: DateTime<Utc>) -> Option<u8> {
    if !inputs.all_finite() {
        return None;
    }
    let factors = SentimentFactors::compute(inputs, now);
    debug!("{}: synthetic factors {:?}", NAME, factors);
    Some(factors.raw_score().clamp(0.0, 100.0).round() as u8)
}

fn point_at(series: &[SentimentPoint], days_ago: usize) -> u8 {
    series[days_ago.min(series.len() - 1)].value
}

/// Builds the index from a newest-first series: entry 0 is current,
/// entries 1/7/30 (or the oldest available) are the history, and the
/// yearly range scans the whole series.
pub fn index_from_series(series: &[SentimentPoint]) -> Option<SentimentIndex> {
    let current = series.first()?;

    let high = series.iter().max_by_key(|p| (p.value, std::cmp::Reverse(p.timestamp)))?;
    let low = series.iter().min_by_key(|p| (p.value, std::cmp::Reverse(p.timestamp)))?;

    let classification = SentimentClassification::from_score(current.value);
    Some(SentimentIndex {
        value: current.value,
        classification,
        description: classification.to_string(),
        historical: IndexHistory {
            yesterday: point_at(series, 1),
            last_week: point_at(series, 7),
            last_month: point_at(series, 30),
        },
        yearly: YearlyRange {
            high: high.value,
            high_date: high.timestamp.date_naive(),
            low: low.value,
            low_date: low.timestamp.date_naive(),
        },
        history_is_approximate: false,
    })
}

fn synthetic_index(value: u8, today: NaiveDate) -> SentimentIndex {
    let (historical, yearly) = approximate_history(&mut rand::rng(), value, today);
    let classification = SentimentClassification::from_score(value);
    SentimentIndex {
        value,
        classification,
        description: format!("{} (estimated)", classification),
        historical,
        yearly,
        history_is_approximate: true,
    }
}

pub struct SentimentIndexCalculator {
    provider: Arc<dyn MarketDataProvider>,
    slot: CacheSlot<SentimentIndex>,
    reference_asset: String,
}

impl SentimentIndexCalculator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        policy: RefreshPolicy,
        entry: CacheEntry<SentimentIndex>,
        reference_asset: String,
    ) -> Self {
        Self {
            provider,
            slot: CacheSlot::new(NAME, policy, entry),
            reference_asset,
        }
    }

    async fn fetch_live(&self) -> Result<SentimentIndex, UpstreamError> {
        let series = self.provider.fetch_sentiment_history(SERIES_DAYS).await?;
        index_from_series(&series)
            .ok_or_else(|| UpstreamError::malformed(SENTIMENT_ENDPOINT, "empty sentiment series"))
    }

    fn estimate(
        &self,
        now: DateTime<Utc>,
        global: Option<&GlobalMetrics>,
        reference_change_24h_pct: Option<f64>,
    ) -> Option<SentimentIndex> {
        let mut inputs = SentimentInputs::from_global(global, &self.reference_asset);
        inputs.reference_change_24h_pct = reference_change_24h_pct;

        let value = synthetic_score(&inputs, now)?;
        warn!("{}: serving synthetic score {} from {:?}", NAME, value, inputs);
        Some(synthetic_index(value, now.date_naive()))
    }

    /// `global` and `reference_change_24h_pct` feed the synthetic score and
    /// come from the other indicators' upstream-backed values, so the
    /// fallback never issues an upstream call of its own.
    pub async fn get(
        &self,
        now: DateTime<Utc>,
        global: Option<&GlobalMetrics>,
        reference_change_24h_pct: Option<f64>,
    ) -> Resolved<SentimentIndex> {
        let mut read = self.slot.refresh_with(now, || self.fetch_live()).await;

        if let Some(failure) = &read.failure {
            warn!("{}: upstream failed ({}), degrading", NAME, failure);
        }

        let value = read
            .live_value(now)
            .or_else(|| read.cached_value())
            .or_else(|| {
                self.estimate(now, global, reference_change_24h_pct)
                    .map(|index| Sourced::new(DataSource::Estimated, None, index))
            })
            .unwrap_or_else(|| {
                warn!("{}: synthetic inputs unusable, serving sentinel", NAME);
                Sourced::new(
                    DataSource::Unavailable,
                    None,
                    SentimentIndex::unavailable(now.date_naive()),
                )
            });

        Resolved {
            value,
            mutated: read.mutated,
        }
    }

    pub async fn entry(&self) -> CacheEntry<SentimentIndex> {
        self.slot.entry().await
    }
}
