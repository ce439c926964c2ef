//! TTL + LRU cache for bulwark.
//!
//! [`SmartCache`] memoizes the results of idempotent operations. Entries
//! expire after their TTL and, when the cache is full, the least recently
//! accessed entry makes room for a new key. Expired entries are removed
//! lazily on lookup, or eagerly by [`SmartCache::purge_expired`] and the
//! background sweeper started with [`SmartCache::spawn_sweeper`].
//!
//! ```
//! use bulwark_cache::{CacheConfig, SmartCache};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: SmartCache<String, String> = SmartCache::new(
//!     CacheConfig::builder()
//!         .name("profiles")
//!         .max_size(10_000)
//!         .default_ttl(Duration::from_secs(300))
//!         .build(),
//! );
//!
//! let profile = cache
//!     .get_or_insert_with("user:42".to_string(), || async {
//!         Ok::<_, std::io::Error>("Ada".to_string())
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(profile, "Ada");
//! assert_eq!(cache.stats().misses, 1);
//!
//! let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
//! drop(sweeper); // stops the background task
//! # }
//! ```
//!
//! # Feature flags
//!
//! - `tracing`: log evictions and sweeps
//! - `metrics`: `cache_requests_total`, `cache_evictions_total` and the `cache_size` gauge
//! - `serde`: derive `Serialize`/`Deserialize` on [`CacheStats`]

mod cache;
mod config;
mod events;
mod stats;
mod store;
mod sweeper;

pub use cache::{EntryInfo, SmartCache};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use events::{CacheEvent, EvictionReason};
pub use stats::CacheStats;
pub use sweeper::SweeperHandle;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "cache_requests_total",
            "Total number of cache lookups by result (hit or miss)"
        );
        metrics::describe_counter!(
            "cache_evictions_total",
            "Total number of cache evictions by reason"
        );
        metrics::describe_gauge!("cache_size", "Current number of entries in the cache");
    });
}
