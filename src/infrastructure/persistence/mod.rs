pub mod in_memory;
pub mod snapshot_store;

pub use in_memory::InMemorySnapshotStore;
pub use snapshot_store::JsonSnapshotStore;
