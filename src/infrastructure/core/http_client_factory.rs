use crate::domain::errors::UpstreamError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a plain HTTP client bounded by `timeout`.
    ///
    /// No retry middleware: a failed call falls through to cached or
    /// estimated data and the refresh policy decides when to try again.
    pub fn create_client(timeout: Duration) -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("cryptopulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Maps a non-success HTTP status to an upstream failure kind.
pub fn classify_status(endpoint: &str, status: StatusCode) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamError::Unauthorized {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited {
            endpoint: endpoint.to_string(),
        },
        other => UpstreamError::unreachable(endpoint, format!("HTTP {}", other)),
    }
}

/// Sends `request` and decodes a JSON body, classifying every failure.
/// Timeouts and connection errors are `Unreachable`.
pub async fn fetch_json<T: DeserializeOwned>(
    endpoint: &str,
    request: RequestBuilder,
) -> Result<T, UpstreamError> {
    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::unreachable(endpoint, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(endpoint, status));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| UpstreamError::unreachable(endpoint, e.to_string()))?;

    serde_json::from_slice(&body).map_err(|e| UpstreamError::malformed(endpoint, e.to_string()))
}
