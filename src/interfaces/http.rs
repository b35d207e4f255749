//! Read-only HTTP surface for the dashboard.

use crate::application::aggregator::MarketAggregator;
use crate::domain::indicators::MarketOverview;
use crate::infrastructure::observability::Metrics;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

pub struct AppState {
    pub aggregator: Arc<MarketAggregator>,
    pub metrics: Metrics,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/market/overview", get(overview))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(Arc::new(state))
}

/// Never fails: every field of the overview degrades independently.
async fn overview(State(state): State<Arc<AppState>>) -> Json<MarketOverview> {
    Json(state.aggregator.get_overview().await)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
