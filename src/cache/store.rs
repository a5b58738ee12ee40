//! Cache Store Module
//!
//! The cache engine: an ordered key-value mapping combining HashMap storage
//! with recency tracking, TTL expiry, and item/byte budget enforcement.
//!
//! `CacheInner` never locks. The public handle acquires the cache lock once
//! per operation and every method here assumes it is held; helpers calling
//! helpers therefore never re-enter the lock.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::entry::{deadline_after, now_ms, CacheEntry};
use crate::cache::order::RecencyList;
use crate::cache::stats::CacheStats;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::size::{parse_byte_size, ByteSizeSpec, SizeEstimator};

// == Delete Hook ==
/// Hook invoked with `(key, value)` on every terminal delete (explicit
/// delete, eviction, expiry, clear).
///
/// Runs synchronously under the cache lock: a slow hook delays concurrent
/// access, a failed hook is logged and swallowed, and the hook must not call
/// back into the cache.
pub type DeleteHook<K, V> = Arc<dyn Fn(&K, &V) -> anyhow::Result<()> + Send + Sync>;

/// Fixed overhead charged for the cache structure itself, independent of
/// entry count. A rough stand-in for the map, deque and config fields.
const STRUCT_OVERHEAD: usize = 256;

// == Cache Inner ==
/// Cache state behind the lock: ordered storage, budgets, and the cached
/// byte-size estimate.
pub(crate) struct CacheInner<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Touch-order tracker; front is the eviction candidate
    order: RecencyList<K>,
    /// Activity counters
    stats: CacheStats,
    /// Default TTL for entries inserted without an explicit TTL
    default_ttl: Option<Duration>,
    /// Maximum number of live entries
    max_items: Option<usize>,
    /// Byte budget as the user supplied it (kept for snapshots)
    max_size_spec: Option<ByteSizeSpec>,
    /// Resolved byte budget
    max_size_bytes: Option<u64>,
    /// Background sweep interval (carried for snapshots)
    sweep_interval: Duration,
    /// Cached total byte-size estimate, refreshed after every structural
    /// mutation before the operation returns
    cached_bytes: u64,
    /// Injected footprint estimator
    estimator: SizeEstimator<K, V>,
    /// Optional terminal-delete hook
    on_delete: Option<DeleteHook<K, V>>,
}

impl<K, V> CacheInner<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    // == Constructor ==
    /// Builds an empty engine from validated configuration.
    ///
    /// `max_size_bytes` is the budget already resolved by
    /// [`CacheConfig::validate`]; the raw spec is retained for export.
    pub(crate) fn new(
        config: &CacheConfig,
        max_size_bytes: Option<u64>,
        estimator: SizeEstimator<K, V>,
        on_delete: Option<DeleteHook<K, V>>,
    ) -> Self {
        let mut inner = Self {
            entries: HashMap::new(),
            order: RecencyList::new(),
            stats: CacheStats::new(),
            default_ttl: config.default_ttl,
            max_items: config.max_items,
            max_size_spec: config.max_size.clone(),
            max_size_bytes,
            sweep_interval: config.sweep_interval,
            cached_bytes: 0,
            estimator,
            on_delete,
        };
        inner.recompute_bytes();
        inner
    }

    // == Get ==
    /// Retrieves a value by key, touching it to most-recently-used.
    ///
    /// An expired entry is removed first (a terminal delete, so the deletion
    /// hook fires) and then reported as `NotFound`.
    pub fn get(&mut self, key: &K) -> Result<V> {
        match self.live_state(key) {
            LiveState::Missing => {
                self.stats.record_miss();
                Err(self.not_found(key))
            }
            LiveState::Expired => {
                self.stats.record_miss();
                self.stats.record_expiration();
                self.remove_entry(key, true, false);
                Err(self.not_found(key))
            }
            LiveState::Live => {
                self.stats.record_hit();
                self.order.touch(key);
                // Live and just touched, so the entry is present
                let entry = self
                    .entries
                    .get(key)
                    .expect("touched key missing from entry map");
                Ok(entry.value.clone())
            }
        }
    }

    // == Set ==
    /// Stores a key-value pair, enforcing both budgets.
    ///
    /// `override_ttl` replaces the default TTL for this entry. Overwriting an
    /// existing key does not count as adding an item for the item-count
    /// check, but the new value is still accounted against the byte budget.
    ///
    /// # Errors
    /// `CacheError::TooLarge` if the key+value footprint alone exceeds the
    /// byte budget. Checked before any state is touched: an oversized entry
    /// is never partially admitted.
    pub fn set(&mut self, key: K, value: V, override_ttl: Option<Duration>) -> Result<()> {
        if let Some(max) = self.max_size_bytes {
            let needed = (self.estimator)(&key, &value) as u64;
            if needed > max {
                return Err(CacheError::TooLarge(format!(
                    "entry of ~{} bytes exceeds byte budget of {}",
                    needed, max
                )));
            }
        }

        let ttl = override_ttl.or(self.default_ttl);

        if self.max_items.is_some() {
            // Expired entries go first; only then evict live ones
            self.purge_expired();
            if let Some(max_items) = self.max_items {
                if !self.entries.contains_key(&key) {
                    while self.entries.len() >= max_items {
                        if self.evict_oldest().is_err() {
                            break;
                        }
                    }
                }
            }
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, ttl));
        self.order.touch(&key);

        if self.max_size_bytes.is_some() {
            self.shrink_to_fit();
        } else {
            self.recompute_bytes();
        }
        Ok(())
    }

    /// Inserts a raw `(key, expire_at, value)` triple without re-stamping the
    /// expiry time. Used when rehydrating exported state; budgets are not
    /// re-enforced because the exporting cache already satisfied them.
    pub fn insert_raw(&mut self, key: K, expires_at: Option<u64>, value: V) {
        self.entries
            .insert(key.clone(), CacheEntry::from_raw(value, expires_at));
        self.order.touch(&key);
    }

    // == Delete ==
    /// Removes an entry as a terminal delete (the hook fires).
    ///
    /// # Errors
    /// `CacheError::NotFound` if the key is absent.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        if self.remove_entry(key, true, false) {
            Ok(())
        } else {
            Err(self.not_found(key))
        }
    }

    /// Terminal delete that ignores missing keys.
    pub fn discard(&mut self, key: &K) {
        self.remove_entry(key, true, false);
    }

    // == Pop ==
    /// Removes and returns a live entry's value; `None` if absent or expired.
    ///
    /// The value is handed to the caller rather than destroyed, so the
    /// deletion hook does not fire.
    pub fn pop(&mut self, key: &K) -> Option<V> {
        self.purge_expired();
        let entry = self.entries.remove(key)?;
        self.order.remove(key);
        self.recompute_bytes();
        Some(entry.value)
    }

    /// Removes and returns the least recently used live entry.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if no live entries remain after purging.
    pub fn pop_oldest(&mut self) -> Result<(K, V)> {
        self.purge_expired();
        let key = self.order.pop_oldest().ok_or(CacheError::EmptyCache)?;
        let entry = self
            .entries
            .remove(&key)
            .expect("order list key missing from entry map");
        self.recompute_bytes();
        Ok((key, entry.value))
    }

    /// Removes and returns the most recently used live entry.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if no live entries remain after purging.
    pub fn pop_newest(&mut self) -> Result<(K, V)> {
        self.purge_expired();
        let key = self.order.pop_newest().ok_or(CacheError::EmptyCache)?;
        let entry = self
            .entries
            .remove(&key)
            .expect("order list key missing from entry map");
        self.recompute_bytes();
        Ok((key, entry.value))
    }

    // == Eviction ==
    /// Removes the least recently used entry as a terminal delete.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if nothing remains after purging expired
    /// entries.
    pub fn evict_oldest(&mut self) -> Result<()> {
        self.purge_expired();
        let key = self
            .order
            .peek_oldest()
            .cloned()
            .ok_or(CacheError::EmptyCache)?;
        debug!(key = ?key, "evicting least recently used entry");
        self.stats.record_eviction();
        self.remove_entry(&key, true, false);
        Ok(())
    }

    // == Purge ==
    /// Removes every expired entry as a terminal delete, then refreshes the
    /// byte-size estimate once. Idempotent: a second call with no intervening
    /// mutation removes nothing.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = now_ms();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.stats.record_expiration();
            self.remove_entry(key, true, true);
        }
        self.recompute_bytes();
        expired.len()
    }

    /// Terminal-deletes every entry, expired or not.
    pub fn clear(&mut self) {
        let keys: Vec<K> = self.order.iter().cloned().collect();
        for key in &keys {
            self.remove_entry(key, true, true);
        }
        self.order.clear();
        self.recompute_bytes();
    }

    // == Views ==
    /// Live keys, least to most recently used. Purges expired entries first.
    pub fn keys(&mut self) -> Vec<K> {
        self.purge_expired();
        self.order.iter().cloned().collect()
    }

    /// Live values in recency order.
    pub fn values(&mut self) -> Vec<V> {
        self.purge_expired();
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Live `(key, value)` pairs in recency order.
    pub fn items(&mut self) -> Vec<(K, V)> {
        self.purge_expired();
        self.order
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|entry| (key.clone(), entry.value.clone()))
            })
            .collect()
    }

    /// Number of live entries. Purges expired entries first.
    pub fn len(&mut self) -> usize {
        self.purge_expired();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Whether a live entry exists for the key. Purges expired entries first.
    pub fn contains(&mut self, key: &K) -> bool {
        self.purge_expired();
        self.entries.contains_key(key)
    }

    /// Raw entry count, including expired entries not yet purged.
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    /// Raw `(key, expire_at, value)` triples in recency order, including
    /// already-expired entries. The export half of the persistence boundary.
    pub fn raw_entries(&self) -> Vec<(K, Option<u64>, V)> {
        self.order
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|entry| (key.clone(), entry.expires_at, entry.value.clone()))
            })
            .collect()
    }

    // == TTL management ==
    /// Remaining TTL for a key: `None` inside the Ok means "never expires".
    /// Clamped to zero once elapsed.
    ///
    /// # Errors
    /// `CacheError::NotFound` if the key is absent.
    pub fn ttl_remaining(&self, key: &K) -> Result<Option<Duration>> {
        let entry = self.entries.get(key).ok_or_else(|| self.not_found(key))?;
        Ok(entry.ttl_remaining())
    }

    /// Re-stamps a key's TTL relative to now (`None` clears expiry) and
    /// touches it to most-recently-used.
    ///
    /// # Errors
    /// `CacheError::NotFound` if the key is absent or already expired (the
    /// expired entry is removed first, as with `get`).
    pub fn set_ttl(&mut self, key: &K, ttl: Option<Duration>) -> Result<()> {
        self.ensure_live(key)?;
        let expires_at = ttl.map(deadline_after);
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = expires_at;
        }
        self.order.touch(key);
        Ok(())
    }

    /// Sets an absolute expiry deadline (Unix milliseconds) and touches the
    /// key to most-recently-used.
    pub fn expire_at(&mut self, key: &K, deadline_ms: u64) -> Result<()> {
        self.ensure_live(key)?;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(deadline_ms);
        }
        self.order.touch(key);
        Ok(())
    }

    /// Whether the key is expired; `None` when the key is unknown (it may
    /// have expired and been purged already, so its state is unknowable).
    pub fn is_expired(&self, key: &K) -> Option<bool> {
        self.entries.get(key).map(CacheEntry::is_expired)
    }

    // == Reconfiguration ==
    /// Replaces the item budget and trims until it is satisfied.
    ///
    /// # Errors
    /// `CacheError::Config` if the new budget is zero.
    pub fn change_max_items(&mut self, max_items: Option<usize>) -> Result<()> {
        if max_items == Some(0) {
            return Err(CacheError::Config("Max items limit must be >0".to_string()));
        }
        self.max_items = max_items;
        if let Some(max) = self.max_items {
            self.purge_expired();
            while self.entries.len() > max {
                if self.evict_oldest().is_err() {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Replaces the byte budget and evicts from the front until the cache
    /// fits. `None` disables the bound.
    ///
    /// # Errors
    /// `CacheError::Config` if the new spec is malformed.
    pub fn change_max_size(&mut self, max_size: Option<ByteSizeSpec>) -> Result<()> {
        let resolved = max_size.as_ref().map(parse_byte_size).transpose()?;
        self.max_size_spec = max_size;
        self.max_size_bytes = resolved;
        self.shrink_to_fit();
        Ok(())
    }

    /// Replaces the default TTL applied to future inserts. Existing entries
    /// keep their stamped deadlines.
    pub fn set_default_ttl(&mut self, default_ttl: Option<Duration>) {
        self.default_ttl = default_ttl;
    }

    // == Accessors ==
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    pub fn max_size_spec(&self) -> Option<ByteSizeSpec> {
        self.max_size_spec.clone()
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_bytes
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// The cached byte-size estimate, refreshed by the last mutation.
    pub fn current_bytes(&self) -> u64 {
        self.cached_bytes
    }

    /// Activity counters. Purges first so the live count is accurate.
    pub fn stats(&mut self) -> CacheStats {
        self.purge_expired();
        self.stats.clone()
    }

    // == Internals ==
    /// Removes an entry, optionally firing the deletion hook first.
    ///
    /// Returns whether an entry was actually removed. With
    /// `skip_size_update` the caller is responsible for recomputing the
    /// byte-size estimate before its operation completes.
    fn remove_entry(&mut self, key: &K, terminal: bool, skip_size_update: bool) -> bool {
        if terminal {
            // Hook sees the entry before it goes away
            if let Some(entry) = self.entries.get(key) {
                self.fire_delete_hook(key, &entry.value);
            }
        }

        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.remove(key);
        }
        if !skip_size_update {
            self.recompute_bytes();
        }
        removed
    }

    /// Invokes the deletion hook, containing any failure it reports.
    fn fire_delete_hook(&self, key: &K, value: &V) {
        if let Some(hook) = &self.on_delete {
            if let Err(err) = hook(key, value) {
                warn!(key = ?key, error = %err, "on_delete hook failed");
            }
        }
    }

    /// Classifies a key, removing nothing.
    fn live_state(&self, key: &K) -> LiveState {
        match self.entries.get(key) {
            None => LiveState::Missing,
            Some(entry) if entry.is_expired() => LiveState::Expired,
            Some(_) => LiveState::Live,
        }
    }

    /// Fails with `NotFound` unless the key holds a live entry; an expired
    /// entry is terminal-deleted on the way.
    fn ensure_live(&mut self, key: &K) -> Result<()> {
        match self.live_state(key) {
            LiveState::Missing => Err(self.not_found(key)),
            LiveState::Expired => {
                self.stats.record_expiration();
                self.remove_entry(key, true, false);
                Err(self.not_found(key))
            }
            LiveState::Live => Ok(()),
        }
    }

    /// Purges expired entries, then evicts from the front until the byte
    /// budget is satisfied or nothing is left to evict.
    fn shrink_to_fit(&mut self) {
        self.purge_expired();
        if let Some(max) = self.max_size_bytes {
            while self.recompute_bytes() > max {
                if self.evict_oldest().is_err() {
                    break;
                }
            }
        }
        self.recompute_bytes();
    }

    /// Recomputes the total byte-size estimate and caches it.
    ///
    /// Runs synchronously inside the mutating operation that called it, so
    /// callers never observe a stale figure.
    pub(crate) fn recompute_bytes(&mut self) -> u64 {
        // Map and order list must agree whenever a mutation completes
        debug_assert_eq!(self.order.len(), self.entries.len());

        // Bookkeeping charged per entry: the order-list key clone plus the
        // expiry stamp. The estimator covers the key and value themselves.
        let per_entry = mem::size_of::<K>() + mem::size_of::<Option<u64>>();
        let mut total = STRUCT_OVERHEAD as u64;
        for (key, entry) in &self.entries {
            total += (per_entry + (self.estimator)(key, &entry.value)) as u64;
        }
        self.cached_bytes = total;
        self.stats.estimated_bytes = total;
        self.stats.live_entries = self.entries.len();
        total
    }

    fn not_found(&self, key: &K) -> CacheError {
        CacheError::NotFound(format!("{:?}", key))
    }
}

/// Entry classification at access time.
enum LiveState {
    Missing,
    Expired,
    Live,
}
