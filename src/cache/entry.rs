//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cache entry: the stored value plus its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// The stored value
    pub value: V,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now, or never for `None`.
    ///
    /// A zero TTL stamps the entry with the current time, so it is expired
    /// immediately (`now >= expires_at` at the instant of creation).
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(deadline_after);
        Self { expires_at, value }
    }

    /// Creates an entry with a raw, pre-stamped expiry timestamp.
    ///
    /// Used when rehydrating persisted state: the original deadline is
    /// preserved instead of being recomputed from now.
    pub fn from_raw(value: V, expires_at: Option<u64>) -> Self {
        Self { expires_at, value }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    /// Expiry check against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining TTL, clamped to zero once elapsed; None if no expiration.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            let now = now_ms();
            Duration::from_millis(expires.saturating_sub(now))
        })
    }
}

// == Utility Functions ==
/// Absolute expiry deadline (Unix milliseconds) `ttl` from now.
///
/// Saturates instead of overflowing: an extreme duration clamps to
/// `u64::MAX`, which in practice never expires.
pub fn deadline_after(ttl: Duration) -> u64 {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now_ms().saturating_add(millis)
}

/// Returns current Unix timestamp in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
