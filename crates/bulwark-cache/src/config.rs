use crate::events::{CacheEvent, EvictionReason};
use bulwark_core::{EventListeners, FnListener, UNNAMED};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Configuration for a [`SmartCache`](crate::SmartCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub(crate) max_size: NonZeroUsize,
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfigBuilder::new().build()
    }
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Maximum number of entries.
    pub fn max_size(&self) -> usize {
        self.max_size.get()
    }

    /// TTL applied by [`SmartCache::set`](crate::SmartCache::set).
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    max_size: usize,
    default_ttl: Option<Duration>,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_size: 1000
    /// - default_ttl: none (entries live until evicted or invalidated)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            max_size: 1000,
            default_ttl: None,
            event_listeners: EventListeners::new(),
            name: UNNAMED.to_string(),
        }
    }

    /// Sets the maximum number of entries. Values below 1 are raised to 1.
    ///
    /// Default: 1000
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the TTL used when an entry is stored without an explicit one.
    ///
    /// Default: none
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the name used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for cache hits.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if matches!(event, CacheEvent::Hit { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for cache misses.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if matches!(event, CacheEvent::Miss { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for evictions.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn(EvictionReason) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if let CacheEvent::Eviction { reason, .. } = event {
                    f(*reason);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            max_size: NonZeroUsize::new(self.max_size).unwrap_or(NonZeroUsize::MIN),
            default_ttl: self.default_ttl,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
