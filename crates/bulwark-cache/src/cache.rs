use crate::config::CacheConfig;
use crate::events::{CacheEvent, EvictionReason};
use crate::stats::{CacheStats, Counters};
use crate::store::{Lookup, Store};
use crate::sweeper::SweeperHandle;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::time::Instant;

pub(crate) struct Inner<K, V> {
    pub(crate) config: CacheConfig,
    pub(crate) store: Mutex<Store<K, V>>,
    pub(crate) counters: Counters,
}

/// Metadata about one stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// Time since the entry was stored.
    pub age: Duration,
    /// Time since the entry was stored or last read.
    pub idle: Duration,
    /// Time left before expiry, `None` when the entry has no TTL. Zero once expired.
    pub expires_in: Option<Duration>,
}

/// A bounded key-value cache with per-entry TTL and least-recently-accessed
/// eviction.
///
/// `SmartCache` is a cheaply cloneable handle; clones share entries and
/// statistics. Every operation takes one short critical section on the
/// internal lock, so concurrent `get`/`set`/eviction are linearizable.
///
/// ```
/// use bulwark_cache::{CacheConfig, SmartCache};
/// use std::time::Duration;
///
/// let cache: SmartCache<String, u32> = SmartCache::new(
///     CacheConfig::builder()
///         .max_size(2)
///         .default_ttl(Duration::from_secs(60))
///         .build(),
/// );
///
/// cache.set("a".to_string(), 1);
/// cache.set("b".to_string(), 2);
/// assert_eq!(cache.get(&"a".to_string()), Some(1)); // "b" is now least recent
/// cache.set("c".to_string(), 3);
///
/// assert_eq!(cache.get(&"b".to_string()), None);
/// assert_eq!(cache.stats().evictions, 1);
/// ```
pub struct SmartCache<K, V> {
    pub(crate) inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for SmartCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for SmartCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartCache")
            .field("name", &self.inner.config.name)
            .field("max_size", &self.inner.config.max_size)
            .finish()
    }
}

impl<K, V> SmartCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        let store = Store::new(config.max_size);
        Self {
            inner: Arc::new(Inner {
                config,
                store: Mutex::new(store),
                counters: Counters::default(),
            }),
        }
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the value for `key` if it is present and unexpired.
    ///
    /// A hit marks the entry as most recently accessed. An expired entry is
    /// removed and reported as a miss and an eviction.
    pub fn get(&self, key: &K) -> Option<V> {
        let lookup = self.inner.store.lock().get(key, Instant::now());
        match lookup {
            Lookup::Hit(value) => {
                self.inner.counters.hit();
                self.record_lookup(true);
                Some(value)
            }
            Lookup::Miss => {
                self.inner.counters.miss();
                self.record_lookup(false);
                None
            }
            Lookup::Expired => {
                self.inner.counters.miss();
                self.record_lookup(false);
                self.record_eviction(EvictionReason::Expired);
                None
            }
        }
    }

    /// Stores `value` under the configured default TTL.
    pub fn set(&self, key: K, value: V) {
        self.insert(key, value, self.inner.config.default_ttl);
    }

    /// Stores `value` with an explicit TTL overriding the default.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.insert(key, value, Some(ttl));
    }

    fn insert(&self, key: K, value: V, ttl: Option<Duration>) {
        let (evicted, size) = {
            let mut store = self.inner.store.lock();
            let evicted = store.insert(key, value, ttl, Instant::now());
            (evicted, store.len())
        };
        if let Some(reason) = evicted {
            self.record_eviction(reason);
        }
        self.record_size(size);
    }

    /// Removes `key`. Returns true if an entry was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        let (removed, size) = {
            let mut store = self.inner.store.lock();
            (store.remove(key), store.len())
        };
        self.record_size(size);
        removed
    }

    /// Removes every entry whose key starts with `prefix`. Returns the number removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize
    where
        K: AsRef<str>,
    {
        let (removed, size) = {
            let mut store = self.inner.store.lock();
            let removed = store.remove_where(|k, _| k.as_ref().starts_with(prefix));
            (removed, store.len())
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(cache = %self.inner.config.name, prefix, removed, "invalidated by prefix");
        self.record_size(size);
        removed
    }

    /// Removes every expired entry now rather than waiting for a lookup.
    /// Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let (purged, size) = {
            let mut store = self.inner.store.lock();
            let purged = store.remove_where(|_, entry| entry.is_expired(now));
            (purged, store.len())
        };
        for _ in 0..purged {
            self.record_eviction(EvictionReason::Expired);
        }
        self.record_size(size);
        purged
    }

    /// Removes every entry. Statistics are kept.
    pub fn clear(&self) {
        self.inner.store.lock().clear();
        self.record_size(0);
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative statistics plus the current size.
    pub fn stats(&self) -> CacheStats {
        let size = self.len();
        self.inner.counters.snapshot(size)
    }

    /// Reads metadata for `key` without counting a lookup or touching recency.
    pub fn entry_info(&self, key: &K) -> Option<EntryInfo> {
        let now = Instant::now();
        let store = self.inner.store.lock();
        store.peek(key).map(|entry| EntryInfo {
            age: now.saturating_duration_since(entry.created_at),
            idle: now.saturating_duration_since(entry.last_accessed_at),
            expires_in: entry.expires_at.map(|at| at.saturating_duration_since(now)),
        })
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// Only successful computations are stored. The lock is not held while
    /// `compute` runs, so concurrent callers missing on the same key may each
    /// compute.
    pub async fn get_or_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Spawns a task that calls [`purge_expired`](Self::purge_expired) every
    /// `interval`.
    ///
    /// The task holds only a weak reference and ends by itself once every
    /// handle to the cache is dropped. Dropping or stopping the returned
    /// handle ends it earlier. Must be called from within a tokio runtime.
    ///
    /// An interval shorter than 1ms, including zero, is treated as 1ms.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle
    where
        K: Send + 'static,
        V: Send + 'static,
    {
        SweeperHandle::spawn(Arc::downgrade(&self.inner), interval)
    }

    fn record_lookup(&self, hit: bool) {
        let timestamp = StdInstant::now();
        let pattern_name = self.inner.config.name.clone();
        #[cfg(feature = "metrics")]
        counter!("cache_requests_total", "cache" => pattern_name.clone(), "result" => if hit { "hit" } else { "miss" })
            .increment(1);
        let event = if hit {
            CacheEvent::Hit {
                pattern_name,
                timestamp,
            }
        } else {
            CacheEvent::Miss {
                pattern_name,
                timestamp,
            }
        };
        self.inner.config.event_listeners.emit(&event);
    }

    fn record_eviction(&self, reason: EvictionReason) {
        self.inner.counters.evicted(reason == EvictionReason::Expired);
        #[cfg(feature = "tracing")]
        tracing::debug!(cache = %self.inner.config.name, reason = reason.as_str(), "entry evicted");
        #[cfg(feature = "metrics")]
        counter!("cache_evictions_total", "cache" => self.inner.config.name.clone(), "reason" => reason.as_str())
            .increment(1);
        self.inner
            .config
            .event_listeners
            .emit(&CacheEvent::Eviction {
                pattern_name: self.inner.config.name.clone(),
                timestamp: StdInstant::now(),
                reason,
            });
    }

    fn record_size(&self, size: usize) {
        #[cfg(feature = "metrics")]
        gauge!("cache_size", "cache" => self.inner.config.name.clone()).set(size as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = size;
    }
}
