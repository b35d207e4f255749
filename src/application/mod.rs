pub mod aggregator;
pub mod indicators;

pub use aggregator::{AggregatorSettings, MarketAggregator};
