//! Circuit breaker tests.
//!
//! - thresholds.rs: consecutive-failure counting and tripping
//! - half_open.rs: recovery timeout, single probe, probe outcomes
//! - concurrency.rs: many tasks sharing one breaker

mod half_open;
