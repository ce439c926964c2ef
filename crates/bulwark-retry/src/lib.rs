//! Retry policies for bulwark.
//!
//! A [`RetryPolicy`] is immutable data: how many attempts to make and how long
//! to wait before each one. Four [`BackoffStrategy`] variants are supported,
//! with optional jitter:
//!
//! | strategy | delay before attempt `k` |
//! |---|---|
//! | Linear | `initial * k` |
//! | Exponential | `initial * 2^(k-2)` |
//! | Fibonacci | `initial * fib(k)` |
//! | Random | uniform in `[0, exponential delay]` |
//!
//! Every delay is capped at `max_delay`; jitter then adds up to 10%.
//!
//! [`Retrier`] runs an async operation under a policy on its own. The
//! executor crate composes the same policy with a circuit breaker and a
//! fallback registry.
//!
//! # Feature flags
//!
//! - `tracing`: log retries and exhaustion
//! - `metrics`: `retry_calls_total` and `retry_attempts_total` counters
//! - `serde`: derive `Serialize`/`Deserialize` on [`RetryPolicy`] and [`BackoffStrategy`]

mod backoff;
mod events;
mod policy;
mod retrier;

pub use backoff::BackoffStrategy;
pub use events::RetryEvent;
pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use retrier::{Retrier, RetrierBuilder, RetryPredicate};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "retry_calls_total",
            "Total number of retried operations by final outcome"
        );
        metrics::describe_counter!(
            "retry_attempts_total",
            "Total number of retry attempts (excluding first attempts)"
        );
    });
}
