use crate::domain::cache::CacheSnapshot;
use crate::domain::errors::PersistenceError;
use crate::domain::ports::SnapshotStore;
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file holding the full cache snapshot, rewritten wholesale on save.
pub struct JsonSnapshotStore {
    file_path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// `~/.cryptopulse/cache_snapshot.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let home = std::env::var("HOME").context("Could not find HOME directory")?;
        Ok(PathBuf::from(home)
            .join(".cryptopulse")
            .join("cache_snapshot.json"))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_failed(&self, reason: impl ToString) -> PersistenceError {
        PersistenceError::ReadFailed {
            path: self.file_path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn write_failed(&self, reason: impl ToString) -> PersistenceError {
        PersistenceError::WriteFailed {
            path: self.file_path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Option<CacheSnapshot>, PersistenceError> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache snapshot at {:?}, starting cold", self.file_path);
                return Ok(None);
            }
            Err(e) => return Err(self.read_failed(e)),
        };

        let snapshot: CacheSnapshot =
            serde_json::from_str(&content).map_err(|e| self.read_failed(e))?;

        info!("Loaded cache snapshot from {:?}", self.file_path);
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &CacheSnapshot) -> Result<(), PersistenceError> {
        if let Some(dir) = self.file_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.write_failed(e))?;
        }

        let content = serde_json::to_string_pretty(snapshot).map_err(|e| self.write_failed(e))?;

        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| self.write_failed(e))?;
        fs::rename(&temp_path, &self.file_path).map_err(|e| self.write_failed(e))?;

        debug!("Saved cache snapshot to {:?}", self.file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheEntry;
    use crate::domain::market::GlobalMetrics;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_missing_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nested").join("snapshot.json"));
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

        let metrics = GlobalMetrics {
            total_market_cap: 3.2e12,
            btc_dominance: 57.0,
            ..GlobalMetrics::default()
        };
        let snapshot = CacheSnapshot {
            global_metrics: CacheSnapshot::record(&CacheEntry::fresh(metrics.clone(), now), now),
            ..CacheSnapshot::default()
        };

        store.save(&snapshot).unwrap();
        assert!(!store.path().with_extension("tmp").exists());

        let loaded = store.load().unwrap().unwrap();
        let entry = CacheSnapshot::restore(loaded.global_metrics);
        assert_eq!(entry.value(), Some(&metrics));
        assert_eq!(entry.last_fetched_at(), Some(now));
    }

    #[test]
    fn test_corrupt_file_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonSnapshotStore::new(path);
        assert!(matches!(store.load(), Err(PersistenceError::ReadFailed { .. })));
    }
}
