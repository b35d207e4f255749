pub mod core;
pub mod mock;
pub mod observability;
pub mod persistence;
pub mod upstream;

pub use mock::MockMarketDataProvider;
pub use persistence::{InMemorySnapshotStore, JsonSnapshotStore};
pub use upstream::UpstreamClient;
