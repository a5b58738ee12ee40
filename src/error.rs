//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the bounded cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid configuration supplied at construction or reconfiguration.
    ///
    /// Non-recoverable for the operation that raised it: nothing is
    /// constructed and no state is changed.
    #[error("Invalid config: {0}")]
    Config(String),

    /// Key absent from the cache, or expired at access time.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A single entry exceeds the configured byte budget.
    ///
    /// The entry is simply not admitted; cache state is unchanged.
    #[error("Entry too large: {0}")]
    TooLarge(String),

    /// Eviction or pop requested on a cache with no live entries.
    #[error("Cache is empty")]
    EmptyCache,
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
