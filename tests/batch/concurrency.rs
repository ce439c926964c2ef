use bulwark_batch::{BatchAggregator, BatchConfig, FlushReason};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_item_is_released_exactly_once() {
    let batcher = BatchAggregator::new(
        BatchConfig::builder()
            .batch_size(10)
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap(),
    );

    let mut producers = Vec::new();
    for producer in 0..8u32 {
        let batcher = batcher.clone();
        producers.push(tokio::spawn(async move {
            let mut batches = Vec::new();
            for i in 0..100u32 {
                if let Some(batch) = batcher.add_item(producer * 1000 + i).unwrap() {
                    batches.push(batch);
                }
            }
            batches
        }));
    }

    let mut batches = Vec::new();
    for producer in producers {
        batches.extend(producer.await.unwrap());
    }
    if let Some(rest) = batcher.flush() {
        batches.push(rest);
    }

    assert!(batches
        .iter()
        .filter(|batch| batch.reason == FlushReason::Size)
        .all(|batch| batch.len() == 10));

    let mut items: Vec<u32> = batches.into_iter().flat_map(|batch| batch.into_items()).collect();
    assert_eq!(items.len(), 800);
    items.sort_unstable();
    items.dedup();
    assert_eq!(items.len(), 800);
}
