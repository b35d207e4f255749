// Cache entries and persisted snapshot layout
pub mod cache;

// Domain-specific error types
pub mod errors;

// Derived indicators and the composite response
pub mod indicators;

// Upstream payloads
pub mod market;

// Port interfaces
pub mod ports;

// Refresh gating
pub mod refresh;

// Sentiment classification bands
pub mod sentiment;
