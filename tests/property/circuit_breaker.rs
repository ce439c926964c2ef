//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - The circuit opens exactly when consecutive failures reach the threshold
//! - An open circuit never calls the operation

use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: state follows the consecutive failure count
    #[test]
    fn opens_at_threshold(
        threshold in 1usize..8,
        outcomes in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreaker::new(
                CircuitBreakerConfig::builder()
                    .failure_threshold(threshold)
                    .recovery_timeout(Duration::from_secs(3600))
                    .build(),
            );
            let calls = AtomicUsize::new(0);
            let mut streak = 0;
            let mut expected_calls = 0;

            for ok in outcomes {
                if streak >= threshold {
                    prop_assert_eq!(breaker.state_sync(), CircuitState::Open);
                } else {
                    prop_assert_eq!(breaker.state_sync(), CircuitState::Closed);
                    expected_calls += 1;
                    streak = if ok { 0 } else { streak + 1 };
                }
                let _ = breaker
                    .call(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move { if ok { Ok(()) } else { Err("fail") } }
                    })
                    .await;
            }

            prop_assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
            Ok(())
        })?;
    }
}
