//! Refresh gating for cached indicators.
//!
//! A "business hours" gate and an "N-day" gate are the same policy with
//! different parameters: a minimum interval plus an optional UTC hour window.

use crate::domain::cache::CacheEntry;
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Half-open UTC hour range `[start_hour, end_hour)`.
///
/// Wraps past midnight when `start_hour > end_hour`; `start_hour == end_hour`
/// covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayRange {
    start_hour: u32,
    end_hour: u32,
}

impl TimeOfDayRange {
    /// Default rotation window, 08:00-20:00 UTC.
    pub const DAYTIME: Self = Self {
        start_hour: 8,
        end_hour: 20,
    };

    pub fn new(start_hour: u32, end_hour: u32) -> anyhow::Result<Self> {
        if start_hour > 23 || end_hour > 24 {
            anyhow::bail!(
                "Invalid refresh window {}-{}: hours must be within 0-24",
                start_hour,
                end_hour
            );
        }
        Ok(Self {
            start_hour,
            end_hour: end_hour % 24,
        })
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        if self.start_hour == self.end_hour {
            true
        } else if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl fmt::Display for TimeOfDayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00 UTC", self.start_hour, self.end_hour)
    }
}

impl FromStr for TimeOfDayRange {
    type Err = anyhow::Error;

    /// Parses `"8-20"` style hour ranges.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("Invalid refresh window '{}': expected START-END", s))?;
        let start: u32 = start
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid refresh window start in '{}'", s))?;
        let end: u32 = end
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid refresh window end in '{}'", s))?;
        Self::new(start, end)
    }
}

/// Decides whether an indicator may hit the upstream right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub min_interval: TimeDelta,
    pub allowed_window: Option<TimeOfDayRange>,
}

impl RefreshPolicy {
    pub fn every(min_interval: TimeDelta) -> Self {
        Self {
            min_interval,
            allowed_window: None,
        }
    }

    pub fn within(mut self, window: TimeOfDayRange) -> Self {
        self.allowed_window = Some(window);
        self
    }

    /// An empty entry always allows the first fetch. Otherwise both the
    /// interval (inclusive) and the window must pass.
    pub fn is_refresh_allowed<T>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
        let Some(last_fetched_at) = entry.last_fetched_at().filter(|_| !entry.is_empty()) else {
            return true;
        };

        if now - last_fetched_at < self.min_interval {
            return false;
        }

        self.allowed_window.is_none_or(|window| window.contains(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_empty_entry_always_allowed() {
        let policy = RefreshPolicy::every(TimeDelta::hours(24)).within(TimeOfDayRange::new(9, 10).unwrap());
        let entry: CacheEntry<u8> = CacheEntry::empty();
        // Outside the window, still allowed
        assert!(policy.is_refresh_allowed(&entry, at(3, 0)));
    }

    #[test]
    fn test_interval_boundary_is_inclusive() {
        let policy = RefreshPolicy::every(TimeDelta::hours(1));
        let now = at(12, 0);

        let just_short = CacheEntry::fresh(1u8, now - TimeDelta::hours(1) + TimeDelta::seconds(1));
        assert!(!policy.is_refresh_allowed(&just_short, now));

        let exact = CacheEntry::fresh(1u8, now - TimeDelta::hours(1));
        assert!(policy.is_refresh_allowed(&exact, now));
    }

    #[test]
    fn test_window_blocks_outside_hours() {
        let policy = RefreshPolicy::every(TimeDelta::minutes(30)).within("8-20".parse().unwrap());
        let entry = CacheEntry::fresh(1u8, at(0, 0) - TimeDelta::days(2));

        assert!(!policy.is_refresh_allowed(&entry, at(7, 59)));
        assert!(policy.is_refresh_allowed(&entry, at(8, 0)));
        assert!(policy.is_refresh_allowed(&entry, at(19, 59)));
        assert!(!policy.is_refresh_allowed(&entry, at(20, 0)));
    }

    #[test]
    fn test_wrapping_window() {
        let window: TimeOfDayRange = "22-2".parse().unwrap();
        assert!(window.contains(at(23, 0)));
        assert!(window.contains(at(1, 30)));
        assert!(!window.contains(at(2, 0)));
        assert!(!window.contains(at(12, 0)));
    }

    #[test]
    fn test_full_day_window() {
        let window = TimeOfDayRange::new(0, 24).unwrap();
        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(23, 59)));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        assert!("25-3".parse::<TimeOfDayRange>().is_err());
        assert!("eight-20".parse::<TimeOfDayRange>().is_err());
        assert!("8".parse::<TimeOfDayRange>().is_err());
    }

    #[test]
    fn test_future_timestamp_blocks_refresh() {
        let policy = RefreshPolicy::every(TimeDelta::minutes(5));
        let entry = CacheEntry::fresh(1u8, at(12, 30));
        assert!(!policy.is_refresh_allowed(&entry, at(12, 0)));
    }
}
