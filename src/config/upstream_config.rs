//! Upstream source configuration parsing from environment variables.

use super::env_or;
use std::env;

/// Upstream API configuration
#[derive(Debug, Clone)]
pub struct UpstreamEnvConfig {
    pub cmc_api_key: String,
    pub cmc_base_url: String,
    pub fng_base_url: String,
    pub binance_base_url: String,
    pub timeout_secs: u64,
    pub unauthorized_alarm_threshold: u32,
}

impl Default for UpstreamEnvConfig {
    fn default() -> Self {
        Self {
            cmc_api_key: String::new(),
            cmc_base_url: "https://pro-api.coinmarketcap.com".to_string(),
            fng_base_url: "https://api.alternative.me".to_string(),
            binance_base_url: "https://api.binance.com".to_string(),
            timeout_secs: 10,
            unauthorized_alarm_threshold: 3,
        }
    }
}

impl UpstreamEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cmc_api_key: env::var("CMC_API_KEY").unwrap_or_default(),
            cmc_base_url: env::var("CMC_BASE_URL").unwrap_or(defaults.cmc_base_url),
            fng_base_url: env::var("FNG_BASE_URL").unwrap_or(defaults.fng_base_url),
            binance_base_url: env::var("BINANCE_BASE_URL").unwrap_or(defaults.binance_base_url),
            timeout_secs: env_or("UPSTREAM_TIMEOUT_SECS", defaults.timeout_secs),
            unauthorized_alarm_threshold: env_or(
                "UNAUTHORIZED_ALARM_THRESHOLD",
                defaults.unauthorized_alarm_threshold,
            ),
        }
    }
}
