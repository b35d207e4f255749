use crate::domain::cache::CacheEntry;
use crate::domain::errors::UpstreamError;
use crate::domain::indicators::{DataSource, Sourced};
use crate::domain::refresh::RefreshPolicy;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Outcome of a guarded refresh attempt.
pub struct SlotRead<T> {
    /// Value fetched by this call, already written to the entry.
    pub live: Option<T>,
    /// Entry contents when no live value was obtained.
    pub cached: Option<(T, DateTime<Utc>)>,
    pub failure: Option<UpstreamError>,
    pub mutated: bool,
}

impl<T> SlotRead<T> {
    pub fn live_value(&mut self, now: DateTime<Utc>) -> Option<Sourced<T>> {
        self.live
            .take()
            .map(|value| Sourced::new(DataSource::Live, Some(now), value))
    }

    pub fn cached_value(&mut self) -> Option<Sourced<T>> {
        self.cached
            .take()
            .map(|(value, at)| Sourced::new(DataSource::Cached, Some(at), value))
    }
}

struct SlotState<T> {
    entry: CacheEntry<T>,
    /// Outcome of the most recent upstream attempt, for coalesced waiters.
    last_failure: Option<UpstreamError>,
}

/// One indicator's cache entry with its refresh policy.
///
/// The state mutex is held from the policy check through the upstream call
/// and the write. Callers that queued behind an attempt reuse its outcome
/// instead of issuing their own, so at most one fetch is in flight and a
/// burst of callers costs one upstream call even when that call fails.
pub struct CacheSlot<T> {
    name: &'static str,
    policy: RefreshPolicy,
    state: Mutex<SlotState<T>>,
    /// Bumped under the lock after every completed attempt.
    attempts: AtomicU64,
}

impl<T: Clone> CacheSlot<T> {
    pub fn new(name: &'static str, policy: RefreshPolicy, entry: CacheEntry<T>) -> Self {
        Self {
            name,
            policy,
            state: Mutex::new(SlotState {
                entry,
                last_failure: None,
            }),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Runs `fetch` if the policy allows it and stores a successful result.
    /// A failed fetch leaves the entry, including `last_fetched_at`, untouched.
    pub async fn refresh_with<F, Fut>(&self, now: DateTime<Utc>, fetch: F) -> SlotRead<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let seen = self.attempts.load(Ordering::SeqCst);
        let mut state = self.state.lock().await;

        if self.attempts.load(Ordering::SeqCst) != seen {
            debug!("{}: joined an attempt finished while queued", self.name);
            return SlotRead {
                live: None,
                cached: cached_pair(&state.entry),
                failure: state.last_failure.clone(),
                mutated: false,
            };
        }

        if !self.policy.is_refresh_allowed(&state.entry, now) {
            debug!(
                "{}: refresh not allowed (last fetch {:?}), serving cache",
                self.name,
                state.entry.last_fetched_at()
            );
            return SlotRead {
                live: None,
                cached: cached_pair(&state.entry),
                failure: None,
                mutated: false,
            };
        }

        let outcome = fetch().await;
        self.attempts.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(value) => {
                state.entry.store(value.clone(), now);
                state.last_failure = None;
                info!("{}: refreshed from upstream", self.name);
                SlotRead {
                    live: Some(value),
                    cached: None,
                    failure: None,
                    mutated: true,
                }
            }
            Err(failure) => {
                state.last_failure = Some(failure.clone());
                SlotRead {
                    live: None,
                    cached: cached_pair(&state.entry),
                    failure: Some(failure),
                    mutated: false,
                }
            }
        }
    }

    pub async fn entry(&self) -> CacheEntry<T> {
        self.state.lock().await.entry.clone()
    }
}

fn cached_pair<T: Clone>(entry: &CacheEntry<T>) -> Option<(T, DateTime<Utc>)> {
    entry.value().cloned().zip(entry.last_fetched_at())
}
