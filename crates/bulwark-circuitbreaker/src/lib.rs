//! Circuit breaker for bulwark.
//!
//! A breaker counts consecutive failures of one named operation. When the
//! count reaches `failure_threshold` the circuit opens and calls are rejected
//! without being attempted. After `recovery_timeout` the next caller becomes
//! the half-open probe: a single trial call whose success (repeated
//! `half_open_successes_required` times) closes the circuit and whose failure
//! opens it again.
//!
//! ```
//! use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .name("inventory")
//!         .failure_threshold(3)
//!         .recovery_timeout(Duration::from_secs(30))
//!         .build(),
//! );
//!
//! for _ in 0..3 {
//!     let _ = breaker.call(|| async { Err::<(), _>("unavailable") }).await;
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//!
//! let rejected = breaker.call(|| async { Ok::<_, &str>(()) }).await;
//! assert!(rejected.unwrap_err().is_circuit_open());
//! # }
//! ```
//!
//! Callers that need to interleave their own logic between the permission
//! check and the outcome (the executor's retry loop does) use
//! [`CircuitBreaker::try_acquire`] and report through the returned
//! [`CallPermit`].
//!
//! # Feature flags
//!
//! - `tracing`: log state transitions and rejections
//! - `metrics`: `circuitbreaker_calls_total`, `circuitbreaker_transitions_total`
//!   and the `circuitbreaker_state` gauge
//! - `serde`: derive `Serialize`/`Deserialize` on [`CircuitState`] and [`CircuitMetrics`]

mod breaker;
mod circuit;
mod config;
mod error;
mod events;

pub use breaker::{CallPermit, CircuitBreaker};
pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "circuitbreaker_calls_total",
            "Total number of calls through the circuit breaker"
        );
        metrics::describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        metrics::describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker (0 closed, 1 open, 2 half-open)"
        );
    });
}
