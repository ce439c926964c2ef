use bulwark_core::ResilienceEvent;
use std::time::Instant;

/// Why an entry left the cache without being invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// The cache was full and the entry was the least recently accessed.
    Capacity,
    /// The entry's TTL had passed.
    Expired,
}

impl EvictionReason {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::Capacity => "capacity",
            EvictionReason::Expired => "expired",
        }
    }
}

/// Events emitted by a [`SmartCache`](crate::SmartCache).
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A lookup found a live entry.
    Hit {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A lookup found nothing, or only an expired entry.
    Miss {
        pattern_name: String,
        timestamp: Instant,
    },
    /// An entry was evicted.
    Eviction {
        pattern_name: String,
        timestamp: Instant,
        reason: EvictionReason,
    },
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { pattern_name, .. }
            | CacheEvent::Miss { pattern_name, .. }
            | CacheEvent::Eviction { pattern_name, .. } => pattern_name,
        }
    }
}
