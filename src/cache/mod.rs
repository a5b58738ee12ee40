//! Cache Module
//!
//! The ordered, bounded cache: entry and recency bookkeeping, the locked
//! engine, the public handle with its builder, snapshot export/import and
//! activity counters.

pub(crate) mod entry;
pub(crate) mod order;
pub(crate) mod store;

pub mod builder;
pub mod handle;
pub mod snapshot;
pub mod stats;


pub use builder::CacheBuilder;
pub use handle::BoundedCache;
pub use snapshot::{CacheSnapshot, SnapshotEntry};
pub use stats::CacheStats;
pub use store::DeleteHook;
