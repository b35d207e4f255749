use thiserror::Error;

/// Failures returned by the upstream market-data sources.
///
/// Expected HTTP error codes are classified here instead of surfacing as
/// transport errors, so callers can branch on the kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream rejected credentials for {endpoint} (HTTP {status})")]
    Unauthorized { endpoint: String, status: u16 },

    #[error("Upstream rate limit hit on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("Upstream unreachable on {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Malformed upstream response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

impl UpstreamError {
    pub fn unreachable(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Unreachable { .. } => "unreachable",
            Self::MalformedResponse { .. } => "malformed",
        }
    }
}

/// Snapshot persistence failures. Both are non-fatal.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read cache snapshot {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write cache snapshot {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}
