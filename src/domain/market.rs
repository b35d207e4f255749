//! Upstream market payloads, already mapped out of provider-specific DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A market category sub-total (e.g. DeFi, stablecoins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub name: String,
    pub market_cap: f64,
    pub change_24h_pct: f64,
}

/// Aggregate market totals.
///
/// `Default` is the documented zero placeholder served when neither a live
/// nor a cached value exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetrics {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub market_cap_change_24h_pct: f64,
    pub volume_change_24h_pct: f64,
    /// Dominance of the largest asset, percent.
    pub btc_dominance: f64,
    /// Dominance of the second largest asset, percent.
    pub eth_dominance: f64,
    pub categories: Vec<CategoryTotal>,
}

impl GlobalMetrics {
    /// True for the zeroed placeholder, which carries no market information.
    pub fn is_placeholder(&self) -> bool {
        self.total_market_cap <= 0.0 && self.btc_dominance <= 0.0
    }

    /// Dominance percent for the two assets the totals report on.
    pub fn dominance_of(&self, symbol: &str) -> Option<f64> {
        let dominance = match symbol.to_uppercase().as_str() {
            "BTC" => self.btc_dominance,
            "ETH" => self.eth_dominance,
            _ => return None,
        };
        Some(dominance).filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// One entry of the ranked asset listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAsset {
    pub symbol: String,
    pub name: String,
    pub rank: u32,
    pub price: f64,
    pub percent_change_24h: Option<f64>,
    pub percent_change_90d: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A single point of the upstream sentiment series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub value: u8,
    pub timestamp: DateTime<Utc>,
}

/// Live 24h ticker for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTicker {
    pub symbol: String,
    pub price: f64,
    pub change_24h_pct: f64,
    /// 24h traded volume in quote currency (USD).
    pub quote_volume_24h: f64,
}
