//! Entry storage: an LRU map of TTL-stamped entries.

use crate::events::EvictionReason;
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    pub(crate) value: V,
    pub(crate) created_at: Instant,
    pub(crate) expires_at: Option<Instant>,
    pub(crate) last_accessed_at: Instant,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            last_accessed_at: now,
        }
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Outcome of a lookup.
pub(crate) enum Lookup<V> {
    Hit(V),
    Miss,
    Expired,
}

/// Map plus recency order. Recency is maintained by `lru` itself: `get`
/// promotes, insertion of a new key at capacity pops the least recent entry.
pub(crate) struct Store<K, V> {
    entries: LruCache<K, Entry<V>>,
}

impl<K: Hash + Eq, V: Clone> Store<K, V> {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub(crate) fn get(&mut self, key: &K, now: Instant) -> Lookup<V> {
        match self.entries.get_mut(key) {
            None => return Lookup::Miss,
            Some(entry) if !entry.is_expired(now) => {
                entry.last_accessed_at = now;
                return Lookup::Hit(entry.value.clone());
            }
            Some(_) => {}
        }
        self.entries.pop(key);
        Lookup::Expired
    }

    /// Reads entry metadata without promoting it or checking expiry.
    pub(crate) fn peek(&self, key: &K) -> Option<&Entry<V>> {
        self.entries.peek(key)
    }

    /// Inserts or overwrites `key`. Returns the reason an older entry had to
    /// make room, if one did.
    pub(crate) fn insert(
        &mut self,
        key: K,
        value: V,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Option<EvictionReason> {
        let entry = Entry::new(value, ttl, now);
        if self.entries.contains(&key) {
            self.entries.put(key, entry);
            return None;
        }
        self.entries.push(key, entry).map(|(_, evicted)| {
            if evicted.is_expired(now) {
                EvictionReason::Expired
            } else {
                EvictionReason::Capacity
            }
        })
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        self.entries.pop(key).is_some()
    }

    pub(crate) fn remove_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&K, &Entry<V>) -> bool,
        K: Clone,
    {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, e)| pred(k, e))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.entries.pop(key);
        }
        doomed.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
