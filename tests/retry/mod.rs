//! Retry tests.
//!
//! - backoff.rs: delay sequences per strategy, caps and jitter bounds
//! - retrier.rs: attempt counting, predicates, events and timing

mod backoff;
