//! Expiry Sweeper Task
//!
//! Background task that periodically purges expired cache entries, so TTLs
//! are enforced even when nothing touches the cache.
//!
//! The task holds only a `Weak` reference to the cache state: dropping the
//! last cache handle both aborts the task (via the guard) and, failing that,
//! makes the next wake-up observe a dead weak reference and exit. Either way
//! the sweeper can never keep a torn-down cache alive.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::store::CacheInner;

// == Sweeper Guard ==
/// Owns the sweeper's stop flag and join handle.
///
/// Shared by all clones of a cache handle; dropping the last clone stops the
/// task. `stop` is also callable explicitly for deterministic teardown.
#[derive(Debug)]
pub(crate) struct SweeperGuard {
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SweeperGuard {
    /// Signals the task to stop and aborts it so teardown is immediate
    /// rather than waiting out the current sleep.
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Spawn ==
/// Starts the background sweeper for a cache, returning its guard.
///
/// Requires a running tokio runtime; without one the sweeper is skipped with
/// a warning and expiry is enforced only by foreground operations.
pub(crate) fn spawn_sweeper<K, V>(
    cache: Weak<RwLock<CacheInner<K, V>>>,
    interval: Duration,
) -> SweeperGuard
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));

    let handle = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let stop_flag = Arc::clone(&stop);
            Some(runtime.spawn(sweep_loop(cache, interval, stop_flag)))
        }
        Err(_) => {
            warn!("no tokio runtime available; background expiry sweeper disabled");
            None
        }
    };

    SweeperGuard {
        stop,
        handle: Mutex::new(handle),
    }
}

/// The sweep loop: sleep, check the stop flag, upgrade the weak reference,
/// purge, repeat. Exits permanently once the flag is set or the cache is
/// gone; the strong reference is dropped before every sleep.
async fn sweep_loop<K, V>(
    cache: Weak<RwLock<CacheInner<K, V>>>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    info!(interval_ms = interval.as_millis() as u64, "expiry sweeper started");

    loop {
        tokio::time::sleep(interval).await;

        if stop.load(Ordering::SeqCst) {
            debug!("expiry sweeper stopped");
            break;
        }

        let Some(cache) = cache.upgrade() else {
            debug!("cache dropped, expiry sweeper exiting");
            break;
        };

        let removed = {
            let mut inner = cache.write().unwrap_or_else(PoisonError::into_inner);
            inner.purge_expired()
        };
        drop(cache);

        if removed > 0 {
            info!(removed, "expiry sweep purged entries");
        } else {
            debug!("expiry sweep found nothing to purge");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::size::shallow_estimator;

    fn short_ttl_inner() -> Arc<RwLock<CacheInner<String, String>>> {
        let config = CacheConfig {
            default_ttl: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        Arc::new(RwLock::new(CacheInner::new(
            &config,
            None,
            shallow_estimator(),
            None,
        )))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_from_raw_storage() {
        let inner = short_ttl_inner();
        {
            let mut guard = inner.write().unwrap();
            guard
                .set("expire_soon".to_string(), "value".to_string(), None)
                .unwrap();
        }

        let sweeper = spawn_sweeper(Arc::downgrade(&inner), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Gone from raw storage, not merely hidden from reads
        assert_eq!(inner.read().unwrap().raw_len(), 0);
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_live_entries() {
        let inner = short_ttl_inner();
        {
            let mut guard = inner.write().unwrap();
            guard
                .set(
                    "long_lived".to_string(),
                    "value".to_string(),
                    Some(Duration::from_secs(3600)),
                )
                .unwrap();
        }

        let sweeper = spawn_sweeper(Arc::downgrade(&inner), Duration::from_millis(30));

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(inner.read().unwrap().raw_len(), 1);
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_cache_dropped() {
        let inner = short_ttl_inner();
        let weak = Arc::downgrade(&inner);
        let sweeper = spawn_sweeper(weak.clone(), Duration::from_millis(20));

        drop(inner);
        tokio::time::sleep(Duration::from_millis(80)).await;

        let finished = sweeper
            .handle
            .lock()
            .unwrap()
            .as_ref()
            .map(|handle| handle.is_finished());
        assert_eq!(finished, Some(true));
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_sweeper_stop_flag_terminates_task() {
        let inner = short_ttl_inner();
        let sweeper = spawn_sweeper(Arc::downgrade(&inner), Duration::from_millis(20));

        sweeper.stop();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let finished = sweeper
            .handle
            .lock()
            .unwrap()
            .as_ref()
            .map(|handle| handle.is_finished());
        // stop() aborts, so the handle is gone entirely
        assert_eq!(finished, None);
    }

    #[test]
    fn test_spawn_without_runtime_is_disabled_not_fatal() {
        let inner = short_ttl_inner();
        let sweeper = spawn_sweeper(Arc::downgrade(&inner), Duration::from_millis(20));
        assert!(sweeper.handle.lock().unwrap().is_none());
    }
}
