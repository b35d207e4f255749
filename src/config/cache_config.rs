//! Cache and refresh-policy configuration parsing from environment variables.
//!
//! Every indicator gets its own `RefreshPolicy`; business-hours and N-day
//! gates are just different parameters.

use super::env_or;
use crate::domain::refresh::{RefreshPolicy, TimeOfDayRange};
use crate::infrastructure::persistence::JsonSnapshotStore;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use std::env;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_GLOBAL_REFRESH_MINUTES: i64 = 60;
const DEFAULT_ROTATION_REFRESH_HOURS: i64 = 12;
const DEFAULT_SENTIMENT_REFRESH_MINUTES: i64 = 60;
const DEFAULT_NETFLOW_REFRESH_MINUTES: i64 = 5;

/// Cache environment configuration
#[derive(Debug, Clone)]
pub struct CacheEnvConfig {
    pub snapshot_path: PathBuf,
    pub reference_asset: String,
    pub rotation_basket_size: usize,
    pub global_refresh_minutes: i64,
    pub rotation_refresh_hours: i64,
    pub rotation_window: Option<TimeOfDayRange>,
    pub sentiment_refresh_minutes: i64,
    pub sentiment_window: Option<TimeOfDayRange>,
    pub netflow_refresh_minutes: i64,
}

impl CacheEnvConfig {
    pub fn from_env() -> Result<Self> {
        let snapshot_path = match env::var("SNAPSHOT_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => JsonSnapshotStore::default_path()?,
        };

        Ok(Self {
            snapshot_path,
            reference_asset: env::var("REFERENCE_ASSET")
                .unwrap_or_else(|_| "BTC".to_string())
                .to_uppercase(),
            rotation_basket_size: env_or("ROTATION_BASKET_SIZE", 50),
            global_refresh_minutes: interval_or(
                "GLOBAL_REFRESH_MINUTES",
                DEFAULT_GLOBAL_REFRESH_MINUTES,
            ),
            rotation_refresh_hours: interval_or(
                "ROTATION_REFRESH_HOURS",
                DEFAULT_ROTATION_REFRESH_HOURS,
            ),
            rotation_window: parse_window("ROTATION_WINDOW", Some("8-20"))?,
            sentiment_refresh_minutes: interval_or(
                "SENTIMENT_REFRESH_MINUTES",
                DEFAULT_SENTIMENT_REFRESH_MINUTES,
            ),
            sentiment_window: parse_window("SENTIMENT_WINDOW", None)?,
            netflow_refresh_minutes: interval_or(
                "NETFLOW_REFRESH_MINUTES",
                DEFAULT_NETFLOW_REFRESH_MINUTES,
            ),
        })
    }

    pub fn global_policy(&self) -> RefreshPolicy {
        RefreshPolicy::every(minutes_or(self.global_refresh_minutes, DEFAULT_GLOBAL_REFRESH_MINUTES))
    }

    pub fn rotation_policy(&self) -> RefreshPolicy {
        with_window(
            RefreshPolicy::every(hours_or(self.rotation_refresh_hours, DEFAULT_ROTATION_REFRESH_HOURS)),
            self.rotation_window,
        )
    }

    pub fn sentiment_policy(&self) -> RefreshPolicy {
        with_window(
            RefreshPolicy::every(minutes_or(
                self.sentiment_refresh_minutes,
                DEFAULT_SENTIMENT_REFRESH_MINUTES,
            )),
            self.sentiment_window,
        )
    }

    pub fn netflow_policy(&self) -> RefreshPolicy {
        RefreshPolicy::every(minutes_or(self.netflow_refresh_minutes, DEFAULT_NETFLOW_REFRESH_MINUTES))
    }
}

/// Negative intervals are treated like any other malformed value.
fn interval_or(key: &str, default: i64) -> i64 {
    let value = env_or(key, default);
    if value < 0 {
        warn!("{} must not be negative (got {}), using {}", key, value, default);
        return default;
    }
    value
}

fn minutes_or(value: i64, default: i64) -> TimeDelta {
    TimeDelta::try_minutes(value.max(0)).unwrap_or_else(|| {
        warn!("Refresh interval of {} minutes is out of range, using {}", value, default);
        TimeDelta::minutes(default)
    })
}

fn hours_or(value: i64, default: i64) -> TimeDelta {
    TimeDelta::try_hours(value.max(0)).unwrap_or_else(|| {
        warn!("Refresh interval of {} hours is out of range, using {}", value, default);
        TimeDelta::hours(default)
    })
}

fn with_window(policy: RefreshPolicy, window: Option<TimeOfDayRange>) -> RefreshPolicy {
    match window {
        Some(window) => policy.within(window),
        None => policy,
    }
}

/// `"none"` or an empty value disables the window.
fn parse_window(key: &str, default: Option<&str>) -> Result<Option<TimeOfDayRange>> {
    let raw = env::var(key)
        .ok()
        .or_else(|| default.map(str::to_string));

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("none") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CacheEnvConfig {
        CacheEnvConfig {
            snapshot_path: PathBuf::from("/tmp/snapshot.json"),
            reference_asset: "BTC".to_string(),
            rotation_basket_size: 50,
            global_refresh_minutes: 60,
            rotation_refresh_hours: 12,
            rotation_window: Some(TimeOfDayRange::new(8, 20).unwrap()),
            sentiment_refresh_minutes: 30,
            sentiment_window: None,
            netflow_refresh_minutes: 5,
        }
    }

    #[test]
    fn test_policies_are_parameterized() {
        let config = config();

        assert_eq!(config.global_policy().min_interval, TimeDelta::hours(1));
        assert!(config.global_policy().allowed_window.is_none());
        assert_eq!(config.rotation_policy().min_interval, TimeDelta::hours(12));
        assert!(config.rotation_policy().allowed_window.is_some());
        assert_eq!(config.sentiment_policy().min_interval, TimeDelta::minutes(30));
    }

    #[test]
    fn test_out_of_range_interval_falls_back_to_default() {
        let config = CacheEnvConfig {
            global_refresh_minutes: i64::MAX,
            rotation_refresh_hours: i64::MAX,
            ..config()
        };

        assert_eq!(config.global_policy().min_interval, TimeDelta::minutes(60));
        assert_eq!(config.rotation_policy().min_interval, TimeDelta::hours(12));
    }

    #[test]
    fn test_negative_interval_is_clamped_to_zero() {
        let config = CacheEnvConfig {
            netflow_refresh_minutes: -5,
            rotation_refresh_hours: -1,
            ..config()
        };

        assert_eq!(config.netflow_policy().min_interval, TimeDelta::zero());
        assert_eq!(config.rotation_policy().min_interval, TimeDelta::zero());
    }

    #[test]
    fn test_negative_env_interval_uses_default() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("CRYPTOPULSE_TEST_NEGATIVE_INTERVAL", "-30") };
        assert_eq!(interval_or("CRYPTOPULSE_TEST_NEGATIVE_INTERVAL", 60), 60);
        unsafe { env::set_var("CRYPTOPULSE_TEST_NEGATIVE_INTERVAL", "15") };
        assert_eq!(interval_or("CRYPTOPULSE_TEST_NEGATIVE_INTERVAL", 60), 15);
    }
}
