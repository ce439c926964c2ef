//! Property tests for least-loaded selection.
//!
//! Invariants tested:
//! - The chosen worker has the minimum load
//! - Ties go to the lowest index
//! - Loads never underflow

use bulwark_pool::{LoadBalancer, least_loaded};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: least_loaded picks the first minimum
    #[test]
    fn picks_first_minimum(loads in prop::collection::vec(0usize..20, 1..16)) {
        let chosen = least_loaded(&loads).unwrap();
        let min = *loads.iter().min().unwrap();
        prop_assert_eq!(loads[chosen], min);
        prop_assert!(loads[..chosen].iter().all(|&load| load > min));
    }

    /// Property: acquire keeps loads within one of each other when nothing completes
    #[test]
    fn acquisitions_stay_balanced(workers in 1usize..10, tasks in 0usize..100) {
        let balancer = LoadBalancer::new(workers);
        for _ in 0..tasks {
            balancer.acquire();
        }
        let loads = balancer.loads();
        prop_assert_eq!(loads.iter().sum::<usize>(), tasks);
        let max = *loads.iter().max().unwrap();
        let min = *loads.iter().min().unwrap();
        prop_assert!(max - min <= 1, "{:?}", loads);
    }

    /// Property: spurious releases never underflow
    #[test]
    fn releases_saturate_at_zero(
        workers in 1usize..8,
        ops in prop::collection::vec((any::<bool>(), 0usize..8), 0..64),
    ) {
        let balancer = LoadBalancer::new(workers);
        let mut expected = vec![0usize; workers];
        for (acquire, worker) in ops {
            if acquire {
                let chosen = balancer.acquire().unwrap();
                expected[chosen] += 1;
            } else {
                balancer.release(worker);
                if let Some(load) = expected.get_mut(worker) {
                    *load = load.saturating_sub(1);
                }
            }
        }
        prop_assert_eq!(balancer.loads(), expected);
    }
}

#[test]
fn empty_loads_have_no_choice() {
    assert_eq!(least_loaded(&[]), None);
    assert_eq!(LoadBalancer::new(0).acquire(), None);
}
