//! Derived indicators served to the dashboard.

use crate::domain::market::GlobalMetrics;
use crate::domain::sentiment::SentimentClassification;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cached,
    Estimated,
    Placeholder,
    Unavailable,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Cached => write!(f, "cached"),
            Self::Estimated => write!(f, "estimated"),
            Self::Placeholder => write!(f, "placeholder"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A resolved value tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sourced<T> {
    pub source: DataSource,
    /// Fetch time of the underlying upstream data, if any.
    pub as_of: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Sourced<T> {
    pub fn new(source: DataSource, as_of: Option<DateTime<Utc>>, data: T) -> Self {
        Self { source, as_of, data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHistory {
    pub yesterday: u8,
    pub last_week: u8,
    pub last_month: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRange {
    pub high: u8,
    pub high_date: NaiveDate,
    pub low: u8,
    pub low_date: NaiveDate,
}

impl YearlyRange {
    pub fn flat(value: u8, date: NaiveDate) -> Self {
        Self {
            high: value,
            high_date: date,
            low: value,
            low_date: date,
        }
    }
}

/// Share of a peer basket outperforming the reference asset, 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationIndex {
    pub value: u8,
    pub is_in_rotation_phase: bool,
    pub description: String,
    pub historical: IndexHistory,
    pub yearly: YearlyRange,
    /// Set when `historical`/`yearly` are a random-walk approximation
    /// rather than recorded history.
    pub history_is_approximate: bool,
}

/// Market mood score, 0-100, with its classification band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentIndex {
    pub value: u8,
    pub classification: SentimentClassification,
    pub description: String,
    pub historical: IndexHistory,
    pub yearly: YearlyRange,
    pub history_is_approximate: bool,
}

impl SentimentIndex {
    /// Sentinel returned when neither the live series nor the synthetic
    /// score is available. Distinguishable from a neutral reading.
    pub fn unavailable(today: NaiveDate) -> Self {
        Self {
            value: 0,
            classification: SentimentClassification::DataUnavailable,
            description: "data unavailable".to_string(),
            historical: IndexHistory {
                yesterday: 0,
                last_week: 0,
                last_month: 0,
            },
            yearly: YearlyRange::flat(0, today),
            history_is_approximate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFlow {
    pub symbol: String,
    /// Estimated flow in millions of USD.
    pub flow: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetChange {
    pub symbol: String,
    pub price: f64,
    pub change_24h_pct: f64,
}

/// Synthetic net-flow figure. Always an estimate: no flow data exists upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetFlowEstimate {
    pub total: i64,
    pub per_asset_breakdown: Vec<AssetFlow>,
    pub per_asset_percent_change: Vec<AssetChange>,
    pub is_estimate: bool,
}

impl NetFlowEstimate {
    pub fn zero() -> Self {
        Self {
            total: 0,
            per_asset_breakdown: Vec::new(),
            per_asset_percent_change: Vec::new(),
            is_estimate: true,
        }
    }
}

/// Composite read-only response for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub global_metrics: Sourced<GlobalMetrics>,
    pub rotation_index: Sourced<RotationIndex>,
    pub sentiment_index: Sourced<SentimentIndex>,
    pub net_flow_estimate: Sourced<NetFlowEstimate>,
    pub generated_at: DateTime<Utc>,
}
