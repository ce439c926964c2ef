//! Property tests for the cache.
//!
//! Invariants tested:
//! - Size never exceeds max_size
//! - The most recently written key is always present
//! - Every lookup is counted as exactly one hit or miss

use bulwark_cache::{CacheConfig, SmartCache};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u32),
    Get(u8),
    Invalidate(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Set(k % 32, v)),
        any::<u8>().prop_map(|k| Op::Get(k % 32)),
        any::<u8>().prop_map(|k| Op::Invalidate(k % 32)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: the cache never holds more than max_size entries
    #[test]
    fn size_is_bounded(max_size in 1usize..16, ops in prop::collection::vec(op(), 0..200)) {
        let cache: SmartCache<u8, u32> =
            SmartCache::new(CacheConfig::builder().max_size(max_size).build());
        let mut lookups = 0u64;

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    cache.set(key, value);
                    prop_assert_eq!(cache.get(&key), Some(value));
                    lookups += 1;
                }
                Op::Get(key) => {
                    let _ = cache.get(&key);
                    lookups += 1;
                }
                Op::Invalidate(key) => {
                    cache.invalidate(&key);
                }
            }
            prop_assert!(cache.len() <= max_size);
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, lookups);
        prop_assert_eq!(stats.size, cache.len());
    }
}
