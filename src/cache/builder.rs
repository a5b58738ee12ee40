//! Cache Builder Module
//!
//! Assembles a [`BoundedCache`] from configuration, hooks and seed data, or
//! rehydrates one from an exported snapshot.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::handle::BoundedCache;
use crate::cache::snapshot::CacheSnapshot;
use crate::cache::store::{CacheInner, DeleteHook};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::size::{shallow_estimator, ByteSizeSpec, SizeEstimator};

// == Cache Builder ==
/// Builder for [`BoundedCache`].
///
/// All constraints are optional; `build` validates them and fails with
/// `CacheError::Config` on invalid input before any cache state exists.
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    estimator: Option<SizeEstimator<K, V>>,
    on_delete: Option<DeleteHook<K, V>>,
    seed: Vec<(K, V)>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            estimator: None,
            on_delete: None,
            seed: Vec::new(),
        }
    }

    /// Starts from an existing configuration (e.g. [`CacheConfig::from_env`]).
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Default TTL applied to entries inserted without an explicit TTL.
    ///
    /// `Duration::ZERO` is honored as "expire immediately".
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = Some(ttl);
        self
    }

    /// Byte budget for the whole cache, e.g. `1024u64` or `"64M"`.
    pub fn max_size(mut self, max_size: impl Into<ByteSizeSpec>) -> Self {
        self.config.max_size = Some(max_size.into());
        self
    }

    /// Maximum number of live entries.
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.config.max_items = Some(max_items);
        self
    }

    /// Interval between background expiry sweeps (default 5 seconds).
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Hook called with `(key, value)` on every terminal delete. Failures
    /// are logged and swallowed; the hook runs under the cache lock and must
    /// not call back into the cache.
    pub fn on_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &V) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_delete = Some(Arc::new(hook));
        self
    }

    /// Injects the footprint estimator used for byte-budget accounting.
    ///
    /// Defaults to a shallow `size_of` estimate; caches of heap-owning types
    /// with a byte budget should supply something deeper, e.g.
    /// [`crate::size::deep_size_estimator`].
    pub fn size_estimator<F>(mut self, estimator: F) -> Self
    where
        F: Fn(&K, &V) -> usize + Send + Sync + 'static,
    {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    /// Entries inserted at construction through the normal set path (they
    /// receive the default TTL and count against both budgets).
    pub fn seed(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        self.seed.extend(entries);
        self
    }

    // == Build ==
    /// Validates the configuration, seeds initial entries, computes the
    /// initial size and starts the sweeper.
    pub fn build(self) -> Result<BoundedCache<K, V>> {
        let max_size_bytes = self.config.validate()?;
        let estimator = self.estimator.unwrap_or_else(shallow_estimator);
        let mut inner = CacheInner::new(&self.config, max_size_bytes, estimator, self.on_delete);

        for (key, value) in self.seed {
            inner.set(key, value, None)?;
        }

        Ok(BoundedCache::start(inner, self.config.sweep_interval))
    }

    // == Restore ==
    /// Rehydrates a cache from an exported snapshot.
    ///
    /// Configuration comes from the snapshot; entries are restored raw, with
    /// their stamped expiry deadlines preserved rather than recomputed. The
    /// hook and estimator, which cannot travel through serialization, come
    /// from this builder. A fresh sweeper is started.
    pub fn restore(self, snapshot: CacheSnapshot<K, V>) -> Result<BoundedCache<K, V>> {
        let config = snapshot.config();
        let max_size_bytes = config.validate()?;
        let estimator = self.estimator.unwrap_or_else(shallow_estimator);
        let mut inner = CacheInner::new(&config, max_size_bytes, estimator, self.on_delete);

        for entry in snapshot.entries {
            inner.insert_raw(entry.key, entry.expires_at, entry.value);
        }
        inner.recompute_bytes();

        Ok(BoundedCache::start(inner, config.sweep_interval))
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
