use super::wait_for_load;
use bulwark_pool::{PoolError, WorkerPool, WorkerPoolConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn panicking_task_releases_its_load() {
    let completions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completions);
    let pool = WorkerPool::new(
        WorkerPoolConfig::builder()
            .num_workers(1)
            .on_complete(move |worker, failed, _| sink.lock().unwrap().push((worker, failed)))
            .build(),
    )
    .unwrap();

    let (_, handle) = pool
        .submit_with_handle(async {
            panic!("task blew up");
        })
        .unwrap();
    assert_eq!(handle.await, Err::<(), _>(PoolError::TaskPanicked));
    wait_for_load(&pool, 0, 0).await;

    // The worker survives and keeps serving.
    let (worker, handle) = pool.submit_with_handle(async { 7 }).unwrap();
    assert_eq!(worker, 0);
    assert_eq!(handle.await.unwrap(), 7);

    pool.shutdown().await;
    assert_eq!(*completions.lock().unwrap(), vec![(0, true), (0, false)]);
}

#[tokio::test]
async fn shutdown_drains_queued_tasks() {
    let pool = WorkerPool::new(WorkerPoolConfig::builder().num_workers(2).build()).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let done = Arc::clone(&done);
        pool.submit(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown().await;
    assert_eq!(done.load(Ordering::SeqCst), 10);
    assert!(pool.is_closed());
    assert_eq!(pool.submit(async {}), Err(PoolError::Closed));
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let result = WorkerPool::new(WorkerPoolConfig::builder().num_workers(0).build());
    assert_eq!(result.unwrap_err(), PoolError::NoWorkers);
}

#[test]
fn needs_a_runtime() {
    let result = WorkerPool::new(WorkerPoolConfig::builder().num_workers(1).build());
    assert_eq!(result.unwrap_err(), PoolError::NoRuntime);
}

#[test]
fn explicit_runtime_handle() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pool = WorkerPool::new(
        WorkerPoolConfig::builder()
            .num_workers(2)
            .runtime(runtime.handle().clone())
            .build(),
    )
    .unwrap();
    let (_, handle) = pool.submit_with_handle(async { 1 + 1 }).unwrap();
    assert_eq!(runtime.block_on(handle).unwrap(), 2);
    runtime.block_on(pool.shutdown());
}
