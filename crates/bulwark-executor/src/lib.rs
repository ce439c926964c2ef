//! Resilient execution for bulwark.
//!
//! [`ResilientExecutor`] composes the retry policy from `bulwark-retry`, one
//! circuit breaker per operation from `bulwark-circuitbreaker`, and a
//! [`FallbackRegistry`] around a single call:
//!
//! ```
//! use bulwark_circuitbreaker::CircuitBreakerConfig;
//! use bulwark_executor::ResilientExecutor;
//! use bulwark_retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = ResilientExecutor::builder()
//!     .name("orders")
//!     .retry_policy(RetryPolicy::builder().max_attempts(2).linear(Duration::from_millis(1)).build())
//!     .breaker_config(CircuitBreakerConfig::builder().failure_threshold(5).build())
//!     .build();
//! executor.fallbacks().register_value::<_, String>("stock-level", 0u32);
//!
//! let result = executor
//!     .execute("stock-level", || async { Err::<u32, _>("warehouse offline".to_string()) })
//!     .await;
//! assert!(result.used_fallback);
//! assert_eq!(result.into_value(), Some(0));
//! # }
//! ```
//!
//! [`ResilientLayer`] applies the same behaviour to any Tower service whose
//! requests can be cloned.
//!
//! # Feature flags
//!
//! - `tracing`: log rejections, retries, fallbacks and timeouts
//! - `metrics`: `executor_calls_total` by outcome and the
//!   `executor_call_duration_seconds` histogram

mod events;
mod executor;
mod fallback;
mod layer;
mod result;
mod service;

pub use events::ExecutorEvent;
pub use executor::{ResilientExecutor, ResilientExecutorBuilder};
pub use fallback::FallbackRegistry;
pub use layer::ResilientLayer;
pub use result::ExecutionResult;
pub use service::ResilientService;

pub use bulwark_core::{ErrorKind, ResilienceError};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "executor_calls_total",
            "Total number of executed operations, by outcome"
        );
        metrics::describe_histogram!(
            "executor_call_duration_seconds",
            metrics::Unit::Seconds,
            "Time spent per executed operation, including retries and fallbacks"
        );
    });
}
