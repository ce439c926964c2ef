use bulwark_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A task was queued on a worker.
    TaskDispatched {
        pattern_name: String,
        timestamp: Instant,
        worker: usize,
        /// The worker's load including this task.
        load: usize,
    },
    /// A worker finished a task.
    TaskCompleted {
        pattern_name: String,
        timestamp: Instant,
        worker: usize,
        /// True if the task panicked.
        failed: bool,
        duration: Duration,
    },
}

impl ResilienceEvent for PoolEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::TaskDispatched { .. } => "task_dispatched",
            PoolEvent::TaskCompleted { .. } => "task_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PoolEvent::TaskDispatched { timestamp, .. }
            | PoolEvent::TaskCompleted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PoolEvent::TaskDispatched { pattern_name, .. }
            | PoolEvent::TaskCompleted { pattern_name, .. } => pattern_name,
        }
    }
}
