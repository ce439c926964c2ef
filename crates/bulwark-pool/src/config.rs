use crate::events::PoolEvent;
use bulwark_core::{EventListeners, FnListener, UNNAMED};
use std::time::Duration;
use tokio::runtime::Handle;

/// Configuration for a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub(crate) num_workers: usize,
    pub(crate) runtime: Option<Handle>,
    pub(crate) event_listeners: EventListeners<PoolEvent>,
    pub(crate) name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        WorkerPoolConfigBuilder::new().build()
    }
}

impl WorkerPoolConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> WorkerPoolConfigBuilder {
        WorkerPoolConfigBuilder::new()
    }

    /// Number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`WorkerPoolConfig`].
pub struct WorkerPoolConfigBuilder {
    num_workers: usize,
    runtime: Option<Handle>,
    event_listeners: EventListeners<PoolEvent>,
    name: String,
}

impl Default for WorkerPoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPoolConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - num_workers: 4
    /// - runtime: the runtime current when the pool is created
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            num_workers: 4,
            runtime: None,
            event_listeners: EventListeners::new(),
            name: UNNAMED.to_string(),
        }
    }

    /// Sets the number of workers. Zero is rejected when the pool is created.
    ///
    /// Default: 4
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    /// Spawns the workers on `handle` instead of the current runtime.
    ///
    /// Useful for isolating pool work on a dedicated runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets the name used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for dispatched tasks, with `(worker, load)`.
    pub fn on_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::TaskDispatched { worker, load, .. } = event {
                    f(*worker, *load);
                }
            }));
        self
    }

    /// Registers a callback for completed tasks, with `(worker, failed, duration)`.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, bool, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::TaskCompleted {
                    worker,
                    failed,
                    duration,
                    ..
                } = event
                {
                    f(*worker, *failed, *duration);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            num_workers: self.num_workers,
            runtime: self.runtime,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
