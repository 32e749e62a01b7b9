//! Record store for tracked videos.
//!
//! This crate provides:
//! - The `RecordStore` port, the only mutation path for video records
//! - Query helpers over store snapshots
//! - An in-memory adapter for tests and embedding
//! - A JSON file adapter with atomic full-document writes
//! - Store metrics

pub mod error;
pub mod file;
pub mod memory;
pub mod metrics;
mod ops;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileRecordStore;
pub use memory::MemoryRecordStore;
pub use store::{RecordStore, RecordStoreExt};

#[cfg(any(test, feature = "mock"))]
pub use store::MockRecordStore;
