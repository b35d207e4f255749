use crate::domain::indicators::{NetFlowEstimate, RotationIndex, SentimentIndex};
use crate::domain::market::GlobalMetrics;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Cached payload plus the time it was fetched.
///
/// Invariant: `value.is_some()` implies `last_fetched_at.is_some()`. The
/// fields are private so the only writers are `store` and `normalized`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    value: Option<T>,
    last_fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> CacheEntry<T> {
    pub fn empty() -> Self {
        Self {
            value: None,
            last_fetched_at: None,
        }
    }

    pub fn fresh(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value: Some(value),
            last_fetched_at: Some(fetched_at),
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn store(&mut self, value: T, fetched_at: DateTime<Utc>) {
        self.value = Some(value);
        self.last_fetched_at = Some(fetched_at);
    }

    /// Time since the last fetch, `None` for an empty entry.
    pub fn age(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.last_fetched_at.map(|at| now - at)
    }

    /// Repairs entries read from disk that break the invariant.
    /// A value without a timestamp cannot be aged, so it is dropped.
    pub fn normalized(self) -> Self {
        match (&self.value, self.last_fetched_at) {
            (Some(_), None) => Self::empty(),
            _ => self,
        }
    }
}

/// One persisted indicator: the entry plus when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord<T> {
    #[serde(flatten)]
    pub entry: CacheEntry<T>,
    pub saved_at: DateTime<Utc>,
}

/// On-disk snapshot of every indicator cache, keyed by indicator name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_metrics: Option<SnapshotRecord<GlobalMetrics>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_index: Option<SnapshotRecord<RotationIndex>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_index: Option<SnapshotRecord<SentimentIndex>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_flow_estimate: Option<SnapshotRecord<NetFlowEstimate>>,
}

impl CacheSnapshot {
    /// Wraps a non-empty entry into a record; empty entries are not persisted.
    pub fn record<T: Clone>(entry: &CacheEntry<T>, saved_at: DateTime<Utc>) -> Option<SnapshotRecord<T>> {
        if entry.is_empty() {
            return None;
        }
        Some(SnapshotRecord {
            entry: entry.clone(),
            saved_at,
        })
    }

    /// Replaces `record` with `entry` unless the stored record was fetched
    /// later. Writers that finish out of order cannot roll a record back.
    pub fn merge_newer<T>(
        record: &mut Option<SnapshotRecord<T>>,
        entry: CacheEntry<T>,
        saved_at: DateTime<Utc>,
    ) {
        let stale = match record {
            Some(existing) => existing.entry.last_fetched_at() <= entry.last_fetched_at(),
            None => true,
        };
        if stale && !entry.is_empty() {
            *record = Some(SnapshotRecord { entry, saved_at });
        }
    }

    /// Extracts the entry of a record, normalized. Missing record means cold start.
    pub fn restore<T>(record: Option<SnapshotRecord<T>>) -> CacheEntry<T> {
        record
            .map(|r| r.entry.normalized())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_store_sets_value_and_timestamp_together() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let mut entry: CacheEntry<u8> = CacheEntry::empty();
        assert!(entry.is_empty());
        assert_eq!(entry.age(now), None);

        entry.store(42, now);
        assert_eq!(entry.value(), Some(&42));
        assert_eq!(entry.last_fetched_at(), Some(now));
        assert_eq!(entry.age(now + TimeDelta::minutes(5)), Some(TimeDelta::minutes(5)));
    }

    #[test]
    fn test_normalized_drops_untimed_value() {
        let broken: CacheEntry<u8> =
            serde_json::from_str(r#"{"value": 7, "lastFetchedAt": null}"#).unwrap();
        assert!(broken.normalized().is_empty());
    }

    #[test]
    fn test_snapshot_skips_empty_entries() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let empty: CacheEntry<GlobalMetrics> = CacheEntry::empty();
        assert!(CacheSnapshot::record(&empty, now).is_none());

        let snapshot = CacheSnapshot::default();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_merge_newer_keeps_later_fetch() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let later = earlier + TimeDelta::minutes(5);
        let mut record = None;

        CacheSnapshot::merge_newer(&mut record, CacheEntry::fresh(2u8, later), later);
        CacheSnapshot::merge_newer(&mut record, CacheEntry::fresh(1u8, earlier), later);
        assert_eq!(record.as_ref().and_then(|r| r.entry.value()), Some(&2));

        CacheSnapshot::merge_newer(&mut record, CacheEntry::empty(), later);
        assert_eq!(record.as_ref().and_then(|r| r.entry.value()), Some(&2));

        let latest = later + TimeDelta::minutes(5);
        CacheSnapshot::merge_newer(&mut record, CacheEntry::fresh(3u8, latest), latest);
        let record = record.unwrap();
        assert_eq!(record.entry.value(), Some(&3));
        assert_eq!(record.saved_at, latest);
    }

    #[test]
    fn test_record_json_layout() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let entry = CacheEntry::fresh(GlobalMetrics::default(), now);
        let record = CacheSnapshot::record(&entry, now).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert!(json.get("value").is_some());
        assert!(json.get("lastFetchedAt").is_some());
        assert!(json.get("savedAt").is_some());
    }
}
