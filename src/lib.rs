//! Bounded Cache - an in-process ordered cache with limits
//!
//! Provides a dictionary-shaped cache with per-entry TTL expiry, LRU
//! eviction bounded by item count, and an approximate total-byte budget,
//! plus a background sweeper and a raw snapshot boundary for persistence.

pub mod cache;
pub mod config;
pub mod error;
pub mod size;

pub(crate) mod tasks;

pub use cache::{BoundedCache, CacheBuilder, CacheSnapshot, CacheStats, DeleteHook, SnapshotEntry};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use size::{
    deep_size_estimator, parse_byte_size, shallow_estimator, ByteSizeSpec, ByteSized,
    SizeEstimator,
};
