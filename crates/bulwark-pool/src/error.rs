use thiserror::Error;

/// Errors returned by [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool has been shut down and accepts no more tasks.
    #[error("worker pool is shut down")]
    Closed,

    /// The pool was configured with zero workers.
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    /// No runtime handle was configured and none is current.
    #[error("no tokio runtime available to spawn workers on")]
    NoRuntime,

    /// The task panicked while running.
    #[error("task panicked")]
    TaskPanicked,

    /// The task was dropped before it produced a result.
    #[error("task was cancelled before completing")]
    TaskCancelled,
}
