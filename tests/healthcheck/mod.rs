//! Health check tests.
//!
//! - isolation.rs: failing, panicking and hung probes
//! - polling.rs: status transitions and the background poller

mod isolation;
