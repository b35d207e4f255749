//! Observability for cryptopulse
//!
//! Metrics are pulled by Prometheus from the `/metrics` route of the HTTP
//! surface; logs go through `tracing`.

pub mod metrics;

pub use metrics::Metrics;
