//! Configuration Module
//!
//! Constraints and tunables for a cache instance, with defaults and optional
//! loading from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::size::{parse_byte_size, ByteSizeSpec};

/// Interval between background sweeps when not configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Cache configuration parameters.
///
/// All bounds are optional; an unset bound is simply not enforced. A
/// `default_ttl` of `Some(Duration::ZERO)` is a valid TTL meaning "expire
/// immediately", distinct from `None` which means "never expire".
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default TTL applied to entries inserted without an explicit TTL
    pub default_ttl: Option<Duration>,
    /// Maximum estimated byte size of the cache
    pub max_size: Option<ByteSizeSpec>,
    /// Maximum number of live entries
    pub max_items: Option<usize>,
    /// Background sweep interval
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_SECS` - Default TTL in seconds (default: unset)
    /// - `CACHE_MAX_SIZE` - Byte budget, raw or suffixed e.g. `64M` (default: unset)
    /// - `CACHE_MAX_ITEMS` - Maximum live entries (default: unset)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 5)
    ///
    /// Unparseable values are treated as unset, including negative or
    /// non-finite durations.
    pub fn from_env() -> Self {
        Self {
            default_ttl: duration_from_env("CACHE_DEFAULT_TTL_SECS"),
            max_size: env::var("CACHE_MAX_SIZE").ok().map(ByteSizeSpec::from),
            max_items: env::var("CACHE_MAX_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok()),
            sweep_interval: duration_from_env("CACHE_SWEEP_INTERVAL_SECS")
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        }
    }

    /// Validates the configuration and resolves the byte budget.
    ///
    /// Returns the byte budget as a concrete count when one is configured.
    ///
    /// # Errors
    /// `CacheError::Config` if `max_items` is zero, the byte-size spec is
    /// malformed, or the sweep interval is zero.
    pub fn validate(&self) -> Result<Option<u64>> {
        if let Some(max_items) = self.max_items {
            if max_items == 0 {
                return Err(CacheError::Config("Max items limit must be >0".to_string()));
            }
        }

        if self.sweep_interval.is_zero() {
            return Err(CacheError::Config("Sweep interval must be >0".to_string()));
        }

        self.max_size.as_ref().map(parse_byte_size).transpose()
    }
}

/// Reads a duration in seconds from an environment variable. `None` for
/// unset, unparseable, negative, non-finite or overflowing values.
fn duration_from_env(var: &str) -> Option<Duration> {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: None,
            max_size: None,
            max_items: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
