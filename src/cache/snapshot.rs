//! Cache Snapshot Module
//!
//! Raw full-state export consumed by external persistence layers. A snapshot
//! carries every entry as a `(key, expire_at, value)` triple — including
//! entries that have already expired — plus the configuration, losslessly.
//! No wire format is mandated; the types derive serde so a persistence
//! collaborator can serialize them however it likes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::size::ByteSizeSpec;

// == Snapshot Entry ==
/// One raw cache entry: stamped expiry deadline and value, untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry<K, V> {
    /// The entry's key
    pub key: K,
    /// Stamped expiry deadline (Unix milliseconds), None = never expires
    pub expires_at: Option<u64>,
    /// The stored value
    pub value: V,
}

// == Cache Snapshot ==
/// Full raw cache state: configuration plus all entries in recency order
/// (least recently used first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot<K, V> {
    /// Default TTL in milliseconds
    pub default_ttl_ms: Option<u64>,
    /// Byte budget as originally supplied
    pub max_size: Option<ByteSizeSpec>,
    /// Item budget
    pub max_items: Option<usize>,
    /// Sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// Raw entries, oldest-touched first
    pub entries: Vec<SnapshotEntry<K, V>>,
}

impl<K, V> CacheSnapshot<K, V> {
    /// Reassembles a `CacheConfig` from the captured fields.
    pub fn config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.default_ttl_ms.map(Duration::from_millis),
            max_size: self.max_size.clone(),
            max_items: self.max_items,
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CacheSnapshot<String, u64> {
        CacheSnapshot {
            default_ttl_ms: Some(60_000),
            max_size: Some("1M".into()),
            max_items: Some(10),
            sweep_interval_ms: 5_000,
            entries: vec![
                SnapshotEntry {
                    key: "a".to_string(),
                    expires_at: Some(1_700_000_000_000),
                    value: 1,
                },
                SnapshotEntry {
                    key: "b".to_string(),
                    expires_at: None,
                    value: 2,
                },
            ],
        }
    }

    #[test]
    fn test_config_round_trip() {
        let snapshot = sample();
        let config = snapshot.config();
        assert_eq!(config.default_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.max_size, Some("1M".into()));
        assert_eq!(config.max_items, Some(10));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_serde_round_trip_preserves_raw_triples() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: CacheSnapshot<String, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        // Expired-or-not is irrelevant here; deadlines survive untouched
        assert_eq!(back.entries[0].expires_at, Some(1_700_000_000_000));
    }
}
