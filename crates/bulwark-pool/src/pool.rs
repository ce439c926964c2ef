use crate::balancer::LoadBalancer;
use crate::config::WorkerPoolConfig;
use crate::error::PoolError;
use crate::events::PoolEvent;
use crate::handle::TaskHandle;
use futures::FutureExt;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = BoxFuture<'static, ()>;

struct Shared {
    config: WorkerPoolConfig,
    balancer: LoadBalancer,
}

struct Inner {
    shared: Arc<Shared>,
    /// Emptied on shutdown.
    queues: RwLock<Vec<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// A fixed set of workers fed by least-loaded dispatch.
///
/// Each worker is a task draining its own FIFO queue one job at a time. A
/// submitted task goes to the worker with the fewest queued or running
/// tasks, ties going to the lowest index. A panicking task is caught; its
/// worker keeps running and its load is still released.
///
/// ```
/// use bulwark_pool::{WorkerPool, WorkerPoolConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), bulwark_pool::PoolError> {
/// let pool = WorkerPool::new(WorkerPoolConfig::builder().num_workers(2).build())?;
///
/// let (worker, handle) = pool.submit_with_handle(async { 6 * 7 })?;
/// assert_eq!(worker, 0);
/// assert_eq!(handle.await?, 42);
///
/// pool.shutdown().await;
/// assert!(pool.submit(async {}).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.inner.shared.config.name)
            .field("loads", &self.get_loads())
            .finish()
    }
}

impl WorkerPool {
    /// Starts the workers.
    ///
    /// Workers are spawned on the configured runtime, or on the current one.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        if config.num_workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        let runtime = match &config.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| PoolError::NoRuntime)?,
        };

        let shared = Arc::new(Shared {
            balancer: LoadBalancer::new(config.num_workers),
            config,
        });

        let mut queues = Vec::with_capacity(shared.config.num_workers);
        let mut workers = Vec::with_capacity(shared.config.num_workers);
        for index in 0..shared.config.num_workers {
            let (tx, rx) = mpsc::unbounded_channel();
            queues.push(tx);
            workers.push(runtime.spawn(run_worker(index, rx, Arc::clone(&shared))));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %shared.config.name, workers = shared.config.num_workers, "worker pool started");

        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                queues: RwLock::new(queues),
                workers: Mutex::new(workers),
            }),
        })
    }

    /// Queues `task` on the least-loaded worker and returns that worker's index.
    pub fn submit<F>(&self, task: F) -> Result<usize, PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.dispatch(Box::pin(task))
    }

    /// Like [`submit`](Self::submit), also returning a handle that resolves
    /// to the task's output.
    pub fn submit_with_handle<F, T>(&self, task: F) -> Result<(usize, TaskHandle<T>), PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job = async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(output) => {
                    let _ = tx.send(Ok(output));
                }
                Err(panic) => {
                    let _ = tx.send(Err(PoolError::TaskPanicked));
                    // let the worker record the failure
                    std::panic::resume_unwind(panic);
                }
            }
        };
        let worker = self.dispatch(Box::pin(job))?;
        Ok((worker, TaskHandle::new(rx)))
    }

    fn dispatch(&self, job: Job) -> Result<usize, PoolError> {
        let shared = &self.inner.shared;
        let queues = self.inner.queues.read();
        if queues.is_empty() {
            return Err(PoolError::Closed);
        }
        let worker = shared.balancer.acquire().ok_or(PoolError::NoWorkers)?;
        if queues[worker].send(job).is_err() {
            shared.balancer.release(worker);
            return Err(PoolError::Closed);
        }
        drop(queues);

        let load = shared.balancer.load(worker);
        #[cfg(feature = "tracing")]
        tracing::trace!(pool = %shared.config.name, worker, load, "task dispatched");
        #[cfg(feature = "metrics")]
        {
            counter!("pool_dispatched_total", "pool" => shared.config.name.clone(), "worker" => worker.to_string())
                .increment(1);
            gauge!("pool_worker_load", "pool" => shared.config.name.clone(), "worker" => worker.to_string())
                .set(load as f64);
        }
        shared.config.event_listeners.emit(&PoolEvent::TaskDispatched {
            pattern_name: shared.config.name.clone(),
            timestamp: Instant::now(),
            worker,
            load,
        });
        Ok(worker)
    }

    /// Snapshot of each worker's queued plus running tasks, indexed by worker.
    pub fn get_loads(&self) -> Vec<usize> {
        self.inner.shared.balancer.loads()
    }

    /// Sum of all worker loads.
    pub fn total_load(&self) -> usize {
        self.get_loads().iter().sum()
    }

    /// Number of workers.
    pub fn num_workers(&self) -> usize {
        self.inner.shared.config.num_workers
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.inner.shared.config.name
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.queues.read().is_empty()
    }

    /// Stops accepting tasks and waits for every worker to drain its queue.
    pub async fn shutdown(&self) {
        self.inner.queues.write().clear();
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %self.inner.shared.config.name, "worker pool shut down");
    }
}

async fn run_worker(index: usize, mut queue: mpsc::UnboundedReceiver<Job>, shared: Arc<Shared>) {
    while let Some(job) = queue.recv().await {
        let started = Instant::now();
        let failed = AssertUnwindSafe(job).catch_unwind().await.is_err();
        shared.balancer.release(index);

        #[cfg(feature = "tracing")]
        if failed {
            tracing::warn!(pool = %shared.config.name, worker = index, "task panicked");
        }
        #[cfg(feature = "metrics")]
        {
            counter!("pool_tasks_total", "pool" => shared.config.name.clone(), "outcome" => if failed { "panicked" } else { "completed" })
                .increment(1);
            gauge!("pool_worker_load", "pool" => shared.config.name.clone(), "worker" => index.to_string())
                .set(shared.balancer.load(index) as f64);
        }
        shared.config.event_listeners.emit(&PoolEvent::TaskCompleted {
            pattern_name: shared.config.name.clone(),
            timestamp: Instant::now(),
            worker: index,
            failed,
            duration: started.elapsed(),
        });
    }
}
