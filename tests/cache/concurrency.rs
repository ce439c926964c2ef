use bulwark_cache::{CacheConfig, SmartCache};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_and_writers_keep_stats_consistent() {
    let cache: SmartCache<u32, u32> =
        SmartCache::new(CacheConfig::builder().max_size(64).build());
    let cache = Arc::new(cache);

    let tasks: Vec<_> = (0..8u32)
        .map(|t| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..500 {
                    let key = (t * 31 + i) % 128;
                    if cache.get(&key).is_none() {
                        cache.set(key, i);
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 8 * 500);
    assert!(stats.size <= 64);
    assert_eq!(stats.size, cache.len());
}
