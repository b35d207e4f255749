use axum::{Json, Router, http::StatusCode, routing::get};
use cryptopulse::config::UpstreamEnvConfig;
use cryptopulse::domain::errors::UpstreamError;
use cryptopulse::domain::ports::MarketDataProvider;
use cryptopulse::infrastructure::observability::Metrics;
use cryptopulse::infrastructure::upstream::UpstreamClient;
use serde_json::json;

/// Serves canned upstream responses on an ephemeral port.
async fn spawn_stub() -> String {
    let app = Router::new()
        .route(
            "/v1/global-metrics/quotes/latest",
            get(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        )
        .route(
            "/v1/cryptocurrency/listings/latest",
            get(|| async { (StatusCode::OK, "not json") }),
        )
        .route(
            "/fng/",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route(
            "/api/v3/ticker/24hr",
            get(|| async {
                Json(json!([
                    {
                        "symbol": "BTCUSDT",
                        "priceChangePercent": "1.25",
                        "quoteVolume": "2500000000.0",
                        "lastPrice": "97250.10"
                    }
                ]))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str, metrics: Metrics) -> UpstreamClient {
    let config = UpstreamEnvConfig {
        cmc_api_key: "test-key".to_string(),
        cmc_base_url: base_url.to_string(),
        fng_base_url: base_url.to_string(),
        binance_base_url: base_url.to_string(),
        timeout_secs: 5,
        unauthorized_alarm_threshold: 3,
    };
    UpstreamClient::new(&config, metrics)
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let base_url = spawn_stub().await;
    let client = client_for(&base_url, Metrics::new().unwrap());

    assert!(matches!(
        client.fetch_global_metrics().await,
        Err(UpstreamError::Unauthorized { status: 401, .. })
    ));
    assert!(matches!(
        client.fetch_sentiment_history(30).await,
        Err(UpstreamError::RateLimited { .. })
    ));
    assert!(matches!(
        client.fetch_ranked_assets(50).await,
        Err(UpstreamError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_ticker_decoding() {
    let base_url = spawn_stub().await;
    let client = client_for(&base_url, Metrics::new().unwrap());

    let tickers = client.fetch_tickers(&["BTC".to_string()]).await.unwrap();
    assert_eq!(tickers.len(), 1);
    assert_eq!(tickers[0].symbol, "BTC");
    assert_eq!(tickers[0].change_24h_pct, 1.25);
    assert_eq!(tickers[0].quote_volume_24h, 2.5e9);
}

#[tokio::test]
async fn test_ticker_fetch_tolerates_missing_pairs() {
    let base_url = spawn_stub().await;
    let client = client_for(&base_url, Metrics::new().unwrap());

    // The stub only knows BTCUSDT
    let tickers = client
        .fetch_tickers(&["BTC".to_string(), "ETH".to_string()])
        .await
        .unwrap();
    assert_eq!(tickers.len(), 1);
    assert_eq!(tickers[0].symbol, "BTC");
}

#[tokio::test]
async fn test_repeated_unauthorized_raises_credential_alarm() {
    let base_url = spawn_stub().await;
    let client = client_for(&base_url, Metrics::new().unwrap());

    // Rate limiting is a different signal and must not count
    for _ in 0..5 {
        let _ = client.fetch_sentiment_history(30).await;
    }
    assert!(!client.health().credentials_suspect("alternative.me"));

    for _ in 0..2 {
        let _ = client.fetch_global_metrics().await;
    }
    assert!(!client.health().credentials_suspect("coinmarketcap"));

    let _ = client.fetch_global_metrics().await;
    assert!(client.health().credentials_suspect("coinmarketcap"));
    assert_eq!(client.health().consecutive_unauthorized("coinmarketcap"), 3);
}

#[tokio::test]
async fn test_upstream_calls_are_counted() {
    let base_url = spawn_stub().await;
    let metrics = Metrics::new().unwrap();
    let client = client_for(&base_url, metrics.clone());

    let _ = client.fetch_global_metrics().await;
    let _ = client.fetch_tickers(&["BTC".to_string()]).await;

    let rendered = metrics.render();
    assert!(rendered.contains("endpoint=\"global-metrics\",outcome=\"unauthorized\""));
    assert!(rendered.contains("endpoint=\"ticker-24hr\",outcome=\"ok\""));
}
