// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the record contract, the snapshot container, the
//! concrete record types and the configuration structures.

mod config;
mod performance;
mod product;
mod record;
mod snapshot;

// Re-export all public types
pub use config::{
    Backoff, CollectorConfig, Config, FeedFields, FetchConfig, KeywordConfig, NotifyChannel,
    NotifyConfig, ProductSelectors, StorageConfig, TaskConfig, TaskKind,
};
pub use performance::Performance;
pub use product::Product;
pub use record::Record;
pub use snapshot::Snapshot;
