//! Core infrastructure for bulwark.
//!
//! This crate holds what every bulwark component shares:
//! - The event system used for observability ([`EventListeners`], [`FnListener`])
//! - The error taxonomy surfaced to callers ([`ResilienceError`], [`ErrorKind`])
//! - The default instance name used when a component is not given one

pub mod error;
pub mod events;

pub use error::{ErrorKind, ResilienceError};
pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, ResilienceEvent};

/// Name given to components that were not explicitly named.
pub const UNNAMED: &str = "<unnamed>";
