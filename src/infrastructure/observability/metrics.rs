//! Prometheus metrics definitions for cryptopulse
//!
//! All metrics use the `cryptopulse_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the aggregation layer
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Upstream calls by endpoint and outcome (ok or failure kind)
    pub upstream_requests_total: CounterVec,
    /// Upstream latency in seconds
    pub upstream_latency_seconds: HistogramVec,
    /// How each indicator was resolved (live, cached, estimated, ...)
    pub indicator_resolutions_total: CounterVec,
    /// Snapshot writes by outcome
    pub snapshot_writes_total: CounterVec,
    /// Last served rotation index (0-100)
    pub rotation_index: GenericGauge<AtomicF64>,
    /// Last served sentiment index (0-100)
    pub sentiment_index: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let upstream_requests_total = CounterVec::new(
            Opts::new(
                "cryptopulse_upstream_requests_total",
                "Upstream requests by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(upstream_requests_total.clone()))?;

        let upstream_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "cryptopulse_upstream_latency_seconds",
                "Upstream request latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(upstream_latency_seconds.clone()))?;

        let indicator_resolutions_total = CounterVec::new(
            Opts::new(
                "cryptopulse_indicator_resolutions_total",
                "Indicator resolutions by data source",
            ),
            &["indicator", "source"],
        )?;
        registry.register(Box::new(indicator_resolutions_total.clone()))?;

        let snapshot_writes_total = CounterVec::new(
            Opts::new(
                "cryptopulse_snapshot_writes_total",
                "Cache snapshot writes by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(snapshot_writes_total.clone()))?;

        let rotation_index = Gauge::with_opts(Opts::new(
            "cryptopulse_rotation_index",
            "Last served rotation index (0-100)",
        ))?;
        registry.register(Box::new(rotation_index.clone()))?;

        let sentiment_index = Gauge::with_opts(Opts::new(
            "cryptopulse_sentiment_index",
            "Last served sentiment index (0-100)",
        ))?;
        registry.register(Box::new(sentiment_index.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            upstream_requests_total,
            upstream_latency_seconds,
            indicator_resolutions_total,
            snapshot_writes_total,
            rotation_index,
            sentiment_index,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn observe_upstream(&self, endpoint: &str, outcome: &str, latency: f64) {
        self.upstream_requests_total
            .with_label_values(&[endpoint, outcome])
            .inc();
        self.upstream_latency_seconds
            .with_label_values(&[endpoint])
            .observe(latency);
    }

    pub fn inc_resolution(&self, indicator: &str, source: &str) {
        self.indicator_resolutions_total
            .with_label_values(&[indicator, source])
            .inc();
    }

    pub fn inc_snapshot_write(&self, outcome: &str) {
        self.snapshot_writes_total.with_label_values(&[outcome]).inc();
    }
}
