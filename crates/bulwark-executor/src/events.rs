use bulwark_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`ResilientExecutor`](crate::ResilientExecutor).
///
/// `pattern_name` is the executor's name; `operation` names the call.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// An attempt failed and another one follows after `delay`.
    Retry {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
        attempt: usize,
        delay: Duration,
    },
    /// The operation's circuit was open.
    Rejected {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
    },
    /// Every attempt failed and no fallback was registered.
    RetriesExhausted {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
        attempts: usize,
    },
    /// A fallback ran after every attempt failed.
    FallbackApplied {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
        succeeded: bool,
    },
    /// The caller's deadline elapsed.
    TimedOut {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
        deadline: Duration,
        attempts: usize,
    },
    /// An attempt panicked; the call ends without retrying.
    Panicked {
        pattern_name: String,
        timestamp: Instant,
        operation: String,
        attempt: usize,
        message: String,
    },
}

impl ExecutorEvent {
    /// Operation the event concerns.
    pub fn operation(&self) -> &str {
        match self {
            ExecutorEvent::Retry { operation, .. }
            | ExecutorEvent::Rejected { operation, .. }
            | ExecutorEvent::RetriesExhausted { operation, .. }
            | ExecutorEvent::FallbackApplied { operation, .. }
            | ExecutorEvent::TimedOut { operation, .. }
            | ExecutorEvent::Panicked { operation, .. } => operation,
        }
    }
}

impl ResilienceEvent for ExecutorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExecutorEvent::Retry { .. } => "retry",
            ExecutorEvent::Rejected { .. } => "rejected",
            ExecutorEvent::RetriesExhausted { .. } => "retries_exhausted",
            ExecutorEvent::FallbackApplied { .. } => "fallback_applied",
            ExecutorEvent::TimedOut { .. } => "timed_out",
            ExecutorEvent::Panicked { .. } => "panicked",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ExecutorEvent::Retry { timestamp, .. }
            | ExecutorEvent::Rejected { timestamp, .. }
            | ExecutorEvent::RetriesExhausted { timestamp, .. }
            | ExecutorEvent::FallbackApplied { timestamp, .. }
            | ExecutorEvent::TimedOut { timestamp, .. }
            | ExecutorEvent::Panicked { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ExecutorEvent::Retry { pattern_name, .. }
            | ExecutorEvent::Rejected { pattern_name, .. }
            | ExecutorEvent::RetriesExhausted { pattern_name, .. }
            | ExecutorEvent::FallbackApplied { pattern_name, .. }
            | ExecutorEvent::TimedOut { pattern_name, .. }
            | ExecutorEvent::Panicked { pattern_name, .. } => pattern_name,
        }
    }
}
