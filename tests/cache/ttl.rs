use bulwark_cache::{CacheConfig, EvictionReason, SmartCache};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn entry_expires_after_its_ttl() {
    let cache: SmartCache<&str, u32> = SmartCache::new(CacheConfig::default());
    cache.set_with_ttl("session", 7, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.get(&"session"), Some(7));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(cache.get(&"session"), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.size, 0);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn default_ttl_applies_to_plain_sets() {
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reasons);
    let cache: SmartCache<u32, u32> = SmartCache::new(
        CacheConfig::builder()
            .default_ttl(Duration::from_secs(5))
            .on_eviction(move |reason| sink.lock().unwrap().push(reason))
            .build(),
    );
    cache.set(1, 1);
    cache.set_with_ttl(2, 2, Duration::from_secs(60));

    let info = cache.entry_info(&1).unwrap();
    assert_eq!(info.expires_in, Some(Duration::from_secs(5)));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.get(&2), Some(2));
    assert_eq!(*reasons.lock().unwrap(), vec![EvictionReason::Expired]);
}

#[tokio::test(start_paused = true)]
async fn sweeper_removes_expired_entries() {
    let cache: SmartCache<u32, &str> = SmartCache::new(CacheConfig::default());
    for key in 0..10 {
        cache.set_with_ttl(key, "v", Duration::from_millis(100));
    }
    cache.set(99, "keep");

    let mut sweeper = cache.spawn_sweeper(Duration::from_millis(250));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().expirations, 10);
    sweeper.stop();
}

#[tokio::test(start_paused = true)]
async fn get_or_insert_with_computes_once_per_miss() {
    let cache: SmartCache<String, usize> = SmartCache::new(CacheConfig::default());
    let computed = std::sync::atomic::AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_insert_with("answer".to_string(), || {
                computed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Ok::<_, String>(42) }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }
    assert_eq!(computed.load(std::sync::atomic::Ordering::SeqCst), 1);

    let failed = cache
        .get_or_insert_with("other".to_string(), || async { Err::<usize, _>("down".to_string()) })
        .await;
    assert!(failed.is_err());
    assert!(cache.get(&"other".to_string()).is_none());
}
