//! Indicator calculators.
//!
//! Each calculator owns one cache slot and a fallback ladder, and its `get`
//! is total: upstream failures degrade the value, never the call.

pub mod global_metrics;
pub mod history;
pub mod net_flow;
pub mod rotation_index;
pub mod sentiment_index;
pub mod slot;

pub use global_metrics::GlobalMetricsCalculator;
pub use net_flow::NetFlowCalculator;
pub use rotation_index::RotationIndexCalculator;
pub use sentiment_index::SentimentIndexCalculator;

use crate::domain::indicators::Sourced;

/// A calculator's answer plus whether its cache entry changed.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: Sourced<T>,
    pub mutated: bool,
}
