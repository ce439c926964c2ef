//! Worker pool with least-loaded dispatch for bulwark.
//!
//! A [`WorkerPool`] owns a fixed number of worker tasks, each draining its
//! own FIFO queue. [`WorkerPool::submit`] routes a task to the worker with
//! the fewest queued or running tasks (ties go to the lowest index) and
//! returns that worker's index. [`WorkerPool::get_loads`] exposes the per-worker
//! load counters the [`LoadBalancer`] keeps.
//!
//! # Feature flags
//!
//! - `tracing`: log worker lifecycle and task panics
//! - `metrics`: `pool_dispatched_total`, `pool_tasks_total` and the
//!   `pool_worker_load` gauge

mod balancer;
mod config;
mod error;
mod events;
mod handle;
mod pool;

pub use balancer::{LoadBalancer, least_loaded};
pub use config::{WorkerPoolConfig, WorkerPoolConfigBuilder};
pub use error::PoolError;
pub use events::PoolEvent;
pub use handle::TaskHandle;
pub use pool::WorkerPool;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "pool_dispatched_total",
            "Total number of tasks dispatched, by worker"
        );
        metrics::describe_counter!(
            "pool_tasks_total",
            "Total number of tasks finished, by outcome"
        );
        metrics::describe_gauge!(
            "pool_worker_load",
            "Queued plus running tasks per worker"
        );
    });
}
