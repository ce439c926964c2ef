//! Resilient executor tests.
//!
//! - retries.rs: retry, fallback and deadline behavior
//! - breaker.rs: per-operation circuit breakers
//! - layer.rs: the tower layer
//! - caching.rs: cache-first execution

mod breaker;
mod retries;

use bulwark_retry::RetryPolicy;
use std::time::Duration;

/// Routes executor logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

pub fn fast_retries(max_attempts: usize) -> RetryPolicy {
    RetryPolicy::builder()
        .max_attempts(max_attempts)
        .linear(Duration::from_millis(10))
        .build()
}
