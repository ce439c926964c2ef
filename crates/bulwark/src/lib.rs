//! Resilient execution and adaptive resource handling for async Rust.
//!
//! `bulwark` bundles a set of single-process fault-tolerance and throughput
//! components. Each one is its own crate and a feature here:
//!
//! - **Retry** (`retry`): linear, exponential, fibonacci and random backoff
//! - **Circuit breaker** (`circuitbreaker`): closed/open/half-open state
//!   machine with a single half-open probe
//! - **Executor** (`executor`): retry, circuit breaking and fallbacks composed
//!   around one named call, plus a Tower layer
//! - **Cache** (`cache`): TTL + LRU cache with statistics
//! - **Health check** (`healthcheck`): isolated probes aggregated into one status
//! - **Pool** (`pool`): fixed workers with least-loaded dispatch
//! - **Batch** (`batch`): size- and timeout-bounded aggregation
//!
//! ```toml
//! [dependencies]
//! bulwark = { version = "0.1", features = ["executor", "healthcheck"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "executor")]
//! # {
//! use bulwark::executor::ResilientExecutor;
//! use bulwark::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let executor = ResilientExecutor::builder()
//!     .name("checkout")
//!     .retry_policy(RetryPolicy::builder().max_attempts(3).exponential(Duration::from_millis(1)).build())
//!     .build();
//!
//! let result = executor
//!     .execute("charge-card", || async { Ok::<_, std::io::Error>("charged") })
//!     .await;
//! assert_eq!(result.attempts, 1);
//! # }
//! # }
//! ```

// Re-export core (always available)
pub use bulwark_core as core;
pub use bulwark_core::{ErrorKind, ResilienceError};

#[cfg(feature = "batch")]
pub use bulwark_batch as batch;

#[cfg(feature = "cache")]
pub use bulwark_cache as cache;

#[cfg(feature = "circuitbreaker")]
pub use bulwark_circuitbreaker as circuitbreaker;

#[cfg(feature = "executor")]
pub use bulwark_executor as executor;

#[cfg(feature = "healthcheck")]
pub use bulwark_healthcheck as healthcheck;

#[cfg(feature = "pool")]
pub use bulwark_pool as pool;

#[cfg(feature = "retry")]
pub use bulwark_retry as retry;
