use crate::domain::cache::CacheSnapshot;
use crate::domain::errors::PersistenceError;
use crate::domain::ports::SnapshotStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Snapshot store kept in memory. Used by the mock mode and by tests,
/// which can also force write failures.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshot: Mutex<Option<CacheSnapshot>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CacheSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<CacheSnapshot> {
        match self.snapshot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self) -> Result<Option<CacheSnapshot>, PersistenceError> {
        Ok(self.current())
    }

    fn save(&self, snapshot: &CacheSnapshot) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed {
                path: "<memory>".to_string(),
                reason: "writes disabled".to_string(),
            });
        }

        self.saves.fetch_add(1, Ordering::SeqCst);
        match self.snapshot.lock() {
            Ok(mut guard) => *guard = Some(snapshot.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot.clone()),
        }
        Ok(())
    }
}
