//! Cache Handle Module
//!
//! The public, thread-safe surface of the cache. A `BoundedCache` is a
//! cloneable handle over the engine; every operation acquires the single
//! cache lock once for its full duration and the engine's helpers assume it
//! is held, so no operation ever re-enters the lock.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use crate::cache::builder::CacheBuilder;
use crate::cache::snapshot::{CacheSnapshot, SnapshotEntry};
use crate::cache::stats::CacheStats;
use crate::cache::store::CacheInner;
use crate::error::Result;
use crate::size::ByteSizeSpec;
use crate::tasks::{spawn_sweeper, SweeperGuard};

// == Bounded Cache ==
/// An ordered key-value cache with per-entry TTL expiry, LRU eviction
/// bounded by item count, and a total-byte budget, swept in the background.
///
/// Handles are cheap to clone and share one underlying cache. The sweeper
/// stops when the last handle is dropped (or on [`BoundedCache::close`]).
///
/// Construction inside a tokio runtime starts the background sweeper;
/// without a runtime the cache still works, enforcing expiry on access only.
pub struct BoundedCache<K, V> {
    inner: Arc<RwLock<CacheInner<K, V>>>,
    sweeper: Arc<SweeperGuard>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Construction ==
    /// An unbounded cache with no default TTL and the default sweep interval.
    pub fn new() -> Self {
        let config = crate::config::CacheConfig::default();
        let inner = CacheInner::new(&config, None, crate::size::shallow_estimator(), None);
        Self::start(inner, config.sweep_interval)
    }

    /// Builder with TTL, budgets, hooks and seed data.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    /// Rehydrates a cache from an exported snapshot. See
    /// [`CacheBuilder::restore`] to re-attach a hook or estimator.
    pub fn restore(snapshot: CacheSnapshot<K, V>) -> Result<Self> {
        CacheBuilder::new().restore(snapshot)
    }

    /// Wraps a built engine and starts its sweeper.
    pub(crate) fn start(inner: CacheInner<K, V>, sweep_interval: Duration) -> Self {
        let inner = Arc::new(RwLock::new(inner));
        let sweeper = spawn_sweeper(Arc::downgrade(&inner), sweep_interval);
        Self {
            inner,
            sweeper: Arc::new(sweeper),
        }
    }

    // == Core operations ==
    /// Returns the value for a live key, touching it to most-recently-used.
    ///
    /// # Errors
    /// `CacheError::NotFound` if the key is absent or expired. An expired
    /// entry is removed on the way (its deletion hook fires).
    pub fn get(&self, key: &K) -> Result<V> {
        self.write().get(key)
    }

    /// Stores a key-value pair under the default TTL, enforcing budgets.
    ///
    /// # Errors
    /// `CacheError::TooLarge` if the entry alone exceeds the byte budget.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.write().set(key, value, None)
    }

    /// Stores a key-value pair with an explicit TTL overriding the default.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        self.write().set(key, value, Some(ttl))
    }

    /// Removes an entry (terminal: the deletion hook fires).
    ///
    /// # Errors
    /// `CacheError::NotFound` if the key is absent.
    pub fn delete(&self, key: &K) -> Result<()> {
        self.write().delete(key)
    }

    /// Removes an entry if present; missing keys are ignored.
    pub fn discard(&self, key: &K) {
        self.write().discard(key)
    }

    /// Removes and returns a live entry's value without firing the hook;
    /// `None` if the key is absent or expired.
    pub fn pop(&self, key: &K) -> Option<V> {
        self.write().pop(key)
    }

    /// Removes and returns the least recently used live entry.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if no live entries remain.
    pub fn pop_oldest(&self) -> Result<(K, V)> {
        self.write().pop_oldest()
    }

    /// Removes and returns the most recently used live entry.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if no live entries remain.
    pub fn pop_newest(&self) -> Result<(K, V)> {
        self.write().pop_newest()
    }

    /// Removes the least recently used live entry as a terminal delete
    /// (the hook fires) and counts it as an eviction.
    ///
    /// # Errors
    /// `CacheError::EmptyCache` if no live entries remain.
    pub fn evict_oldest(&self) -> Result<()> {
        self.write().evict_oldest()
    }

    /// Removes every expired entry now; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.write().purge_expired()
    }

    /// Terminal-deletes everything, expired or not.
    pub fn clear(&self) {
        self.write().clear()
    }

    // == Views ==
    /// Live keys, least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        self.write().keys()
    }

    /// Live values in recency order.
    pub fn values(&self) -> Vec<V> {
        self.write().values()
    }

    /// Live `(key, value)` pairs in recency order.
    pub fn items(&self) -> Vec<(K, V)> {
        self.write().items()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.write().len()
    }

    pub fn is_empty(&self) -> bool {
        self.write().is_empty()
    }

    /// Whether a live entry exists for the key.
    pub fn contains(&self, key: &K) -> bool {
        self.write().contains(key)
    }

    // == TTL management ==
    /// Remaining TTL for a key (`Ok(None)` = never expires), clamped to zero.
    pub fn ttl_remaining(&self, key: &K) -> Result<Option<Duration>> {
        self.write().ttl_remaining(key)
    }

    /// Re-stamps a key's TTL from now; `None` clears expiry. Touches the key.
    pub fn set_ttl(&self, key: &K, ttl: Option<Duration>) -> Result<()> {
        self.write().set_ttl(key, ttl)
    }

    /// Sets an absolute expiry deadline in Unix milliseconds. Touches the key.
    pub fn expire_at(&self, key: &K, deadline_ms: u64) -> Result<()> {
        self.write().expire_at(key, deadline_ms)
    }

    /// Whether the key is expired; `None` when the key is unknown.
    pub fn is_expired(&self, key: &K) -> Option<bool> {
        self.write().is_expired(key)
    }

    // == Reconfiguration ==
    /// Replaces the item budget and evicts until it is satisfied.
    pub fn change_max_items(&self, max_items: Option<usize>) -> Result<()> {
        self.write().change_max_items(max_items)
    }

    /// Replaces the byte budget and evicts until the cache fits.
    pub fn change_max_size(&self, max_size: Option<ByteSizeSpec>) -> Result<()> {
        self.write().change_max_size(max_size)
    }

    /// Replaces the default TTL for future inserts.
    pub fn set_default_ttl(&self, default_ttl: Option<Duration>) {
        self.write().set_default_ttl(default_ttl)
    }

    // == Introspection ==
    pub fn default_ttl(&self) -> Option<Duration> {
        self.write().default_ttl()
    }

    pub fn max_items(&self) -> Option<usize> {
        self.write().max_items()
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        self.write().max_size_bytes()
    }

    /// The cached byte-size estimate as of the last mutation.
    pub fn current_bytes(&self) -> u64 {
        self.write().current_bytes()
    }

    /// Activity counters (hits, misses, evictions, expirations).
    pub fn stats(&self) -> CacheStats {
        self.write().stats()
    }

    // == Snapshot boundary ==
    /// Full raw state export for external persistence: configuration plus
    /// every entry as a `(key, expire_at, value)` triple in recency order,
    /// including entries that have already expired. Nothing is purged and
    /// no deadline is re-stamped.
    pub fn snapshot(&self) -> CacheSnapshot<K, V> {
        let inner = self.write();
        CacheSnapshot {
            default_ttl_ms: inner.default_ttl().map(|ttl| ttl.as_millis() as u64),
            max_size: inner.max_size_spec(),
            max_items: inner.max_items(),
            sweep_interval_ms: inner.sweep_interval().as_millis() as u64,
            entries: inner
                .raw_entries()
                .into_iter()
                .map(|(key, expires_at, value)| SnapshotEntry {
                    key,
                    expires_at,
                    value,
                })
                .collect(),
        }
    }

    // == Teardown ==
    /// Stops the background sweeper now. The cache itself remains usable;
    /// expiry is enforced by foreground operations from here on.
    pub fn close(&self) {
        self.sweeper.stop();
    }

    /// Acquires the cache lock, recovering from poisoning: the engine never
    /// leaves partial state behind a panic, so the data is still consistent.
    fn write(&self) -> RwLockWriteGuard<'_, CacheInner<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for BoundedCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for BoundedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.write();
        f.debug_struct("BoundedCache")
            .field("default_ttl", &inner.default_ttl())
            .field("max_items", &inner.max_items())
            .field("max_size_bytes", &inner.max_size_bytes())
            .field("raw_entries", &inner.raw_len())
            .field("estimated_bytes", &inner.current_bytes())
            .finish()
    }
}

// == Equality ==
/// Two caches are equal iff their live key→value sequences match, expiry
/// metadata ignored. Both sides are purged first; locks are taken in
/// address order so concurrent `a == b` and `b == a` cannot deadlock.
impl<K, V> PartialEq for BoundedCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let (first, second) = if Arc::as_ptr(&self.inner) < Arc::as_ptr(&other.inner) {
            (self, other)
        } else {
            (other, self)
        };
        let mut first_guard = first.write();
        let mut second_guard = second.write();
        first_guard.items() == second_guard.items()
    }
}

/// Comparison against a plain ordered sequence of pairs.
impl<K, V> PartialEq<Vec<(K, V)>> for BoundedCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn eq(&self, other: &Vec<(K, V)>) -> bool {
        self.items() == *other
    }
}
