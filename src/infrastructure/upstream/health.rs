use crate::domain::errors::UpstreamError;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Tracks consecutive credential rejections per upstream source.
///
/// Repeated `Unauthorized` means a misconfigured key and is logged at
/// `error` with a dedicated message; rate limiting and outages only `warn`
/// and never count towards the alarm. Any success resets the counter.
pub struct UpstreamHealth {
    alarm_threshold: u32,
    consecutive_unauthorized: Mutex<HashMap<String, u32>>,
}

impl UpstreamHealth {
    pub fn new(alarm_threshold: u32) -> Self {
        Self {
            alarm_threshold: alarm_threshold.max(1),
            consecutive_unauthorized: Mutex::new(HashMap::new()),
        }
    }

    pub fn record<T>(&self, source: &str, result: &Result<T, UpstreamError>) {
        let mut counts = match self.consecutive_unauthorized.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("UpstreamHealth: Lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        match result {
            Ok(_) => {
                if let Some(previous) = counts.remove(source).filter(|c| *c > 0) {
                    info!(
                        "UpstreamHealth [{}]: credentials accepted again after {} rejection(s)",
                        source, previous
                    );
                }
            }
            Err(err @ UpstreamError::Unauthorized { .. }) => {
                let count = counts.entry(source.to_string()).or_insert(0);
                *count += 1;
                if *count >= self.alarm_threshold {
                    error!(
                        source,
                        consecutive = *count,
                        "UpstreamHealth [{}]: CREDENTIALS REJECTED {} times in a row ({}). Check the configured API key.",
                        source,
                        count,
                        err
                    );
                } else {
                    warn!("UpstreamHealth [{}]: {}", source, err);
                }
            }
            Err(err @ UpstreamError::RateLimited { .. }) => {
                warn!(source, "UpstreamHealth [{}]: rate limited, serving fallback ({})", source, err);
            }
            Err(err) => {
                warn!(source, "UpstreamHealth [{}]: {}", source, err);
            }
        }
    }

    pub fn consecutive_unauthorized(&self, source: &str) -> u32 {
        match self.consecutive_unauthorized.lock() {
            Ok(guard) => guard.get(source).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(source).copied().unwrap_or(0),
        }
    }

    /// True once a source has crossed the credential alarm threshold.
    pub fn credentials_suspect(&self, source: &str) -> bool {
        self.consecutive_unauthorized(source) >= self.alarm_threshold
    }
}
