use crate::domain::errors::UpstreamError;
use crate::domain::market::SentimentPoint;
use crate::infrastructure::core::http_client_factory::fetch_json;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

pub const SENTIMENT_ENDPOINT: &str = "fear-and-greed";

#[derive(Debug, Deserialize)]
struct AlternativeMeResponse {
    data: Vec<AlternativeMeData>,
}

#[derive(Debug, Deserialize)]
struct AlternativeMeData {
    value: String,
    // Informational only, the band is recomputed from `value`
    #[serde(rename = "value_classification", default)]
    _value_classification: Option<String>,
    timestamp: String,
}

/// Alternative.me Crypto Fear & Greed series.
pub struct AlternativeMeClient {
    client: Client,
    base_url: String,
}

impl AlternativeMeClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_history(&self, days: usize) -> Result<Vec<SentimentPoint>, UpstreamError> {
        info!("Fetching sentiment history from Alternative.me ({} days)...", days);

        let url = format!("{}/fng/", self.base_url);
        let limit = days.to_string();
        let request = self.client.get(&url).query(&[("limit", limit.as_str())]);

        let body: AlternativeMeResponse = fetch_json(SENTIMENT_ENDPOINT, request).await?;
        parse_series(body)
    }
}

fn parse_series(body: AlternativeMeResponse) -> Result<Vec<SentimentPoint>, UpstreamError> {
    if body.data.is_empty() {
        return Err(UpstreamError::malformed(
            SENTIMENT_ENDPOINT,
            "no sentiment data found in response",
        ));
    }

    body.data
        .into_iter()
        .map(|point| {
            let value: u8 = point.value.parse().map_err(|_| {
                UpstreamError::malformed(SENTIMENT_ENDPOINT, format!("bad value '{}'", point.value))
            })?;
            if value > 100 {
                return Err(UpstreamError::malformed(
                    SENTIMENT_ENDPOINT,
                    format!("value {} out of range", value),
                ));
            }
            let secs: i64 = point.timestamp.parse().map_err(|_| {
                UpstreamError::malformed(
                    SENTIMENT_ENDPOINT,
                    format!("bad timestamp '{}'", point.timestamp),
                )
            })?;
            let timestamp = Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
                UpstreamError::malformed(SENTIMENT_ENDPOINT, format!("timestamp {} out of range", secs))
            })?;
            Ok(SentimentPoint { value, timestamp })
        })
        .collect()
}
