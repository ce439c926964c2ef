use bulwark_batch::{Batch, BatchAggregator, BatchConfig, BatchError, FlushReason};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn collecting(size: usize, timeout_ms: u64) -> (BatchAggregator<u32>, Arc<Mutex<Vec<Batch<u32>>>>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let config = BatchConfig::builder()
        .batch_size(size)
        .timeout(Duration::from_millis(timeout_ms))
        .on_batch(move |batch| sink.lock().unwrap().push(batch))
        .build()
        .unwrap();
    (BatchAggregator::new(config), delivered)
}

#[tokio::test(start_paused = true)]
async fn partial_batch_is_released_on_timeout() {
    let (batcher, delivered) = collecting(3, 100);
    assert_eq!(batcher.add_item(1), Ok(None));
    assert_eq!(batcher.add_item(2), Ok(None));

    tokio::time::sleep(Duration::from_millis(150)).await;

    let delivered = delivered.lock().unwrap();
    assert_eq!(
        *delivered,
        vec![Batch {
            items: vec![1, 2],
            reason: FlushReason::Timeout
        }]
    );
    assert_eq!(batcher.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn full_batch_goes_to_the_caller() {
    let (batcher, delivered) = collecting(3, 100);
    batcher.add_item(1).unwrap();
    batcher.add_item(2).unwrap();
    let batch = batcher.add_item(3).unwrap().unwrap();
    assert_eq!(batch.items, vec![1, 2, 3]);
    assert_eq!(batch.reason, FlushReason::Size);

    // The timer armed by the first item must not fire for the next buffer.
    batcher.add_item(4).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(delivered.lock().unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(60)).await;

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].items, vec![4]);
}

#[tokio::test(start_paused = true)]
async fn close_returns_the_remainder_and_rejects_items() {
    let (batcher, delivered) = collecting(10, 100);
    batcher.add_item(1).unwrap();
    batcher.add_item(2).unwrap();

    let rest = batcher.close().unwrap();
    assert_eq!(rest.items, vec![1, 2]);
    assert_eq!(rest.reason, FlushReason::Manual);
    assert!(batcher.is_closed());
    assert_eq!(batcher.add_item(3), Err(BatchError::Closed));
    assert_eq!(batcher.close(), None);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(delivered.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn release_callback_sees_every_reason() {
    let releases = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&releases);
    let batcher = BatchAggregator::new(
        BatchConfig::builder()
            .batch_size(2)
            .timeout(Duration::from_millis(50))
            .name("audit-log")
            .on_batch(|_: Batch<&str>| {})
            .on_release(move |size, reason| sink.lock().unwrap().push((size, reason)))
            .build()
            .unwrap(),
    );
    assert_eq!(batcher.name(), "audit-log");

    batcher.add_item("a").unwrap();
    batcher.add_item("b").unwrap();
    batcher.add_item("c").unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    batcher.add_item("d").unwrap();
    batcher.flush();

    assert_eq!(
        *releases.lock().unwrap(),
        vec![
            (2, FlushReason::Size),
            (1, FlushReason::Timeout),
            (1, FlushReason::Manual)
        ]
    );
}

#[test]
fn zero_batch_size_is_rejected() {
    let result = BatchConfig::<u8>::builder().batch_size(0).build();
    assert_eq!(result.err(), Some(BatchError::InvalidBatchSize));
}
