use bulwark_retry::{BackoffStrategy, RetryPolicy};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_secs).collect()
}

#[test]
fn exponential_doubles_then_caps() {
    let policy = RetryPolicy::builder()
        .max_attempts(7)
        .initial_delay(Duration::from_secs(1))
        .max_delay(Duration::from_secs(30))
        .strategy(BackoffStrategy::Exponential)
        .build();

    let delays: Vec<Duration> = (2..=5).map(|k| policy.delay_for_attempt(k)).collect();
    assert_eq!(delays, secs(&[1, 2, 4, 8]));

    // 32s uncapped
    assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(30));
}

#[test]
fn linear_and_fibonacci_sequences() {
    let linear = RetryPolicy::builder()
        .max_attempts(6)
        .linear(Duration::from_secs(1))
        .build();
    let delays: Vec<Duration> = (2..=5).map(|k| linear.delay_for_attempt(k)).collect();
    assert_eq!(delays, secs(&[2, 3, 4, 5]));

    let fibonacci = RetryPolicy::builder()
        .max_attempts(8)
        .fibonacci(Duration::from_secs(1))
        .build();
    let delays: Vec<Duration> = (2..=7).map(|k| fibonacci.delay_for_attempt(k)).collect();
    assert_eq!(delays, secs(&[1, 2, 3, 5, 8, 13]));
}

#[test]
fn max_delay_bounds_every_strategy() {
    let cap = Duration::from_millis(250);
    for strategy in [
        BackoffStrategy::Linear,
        BackoffStrategy::Exponential,
        BackoffStrategy::Fibonacci,
        BackoffStrategy::Random,
    ] {
        let policy = RetryPolicy::builder()
            .max_attempts(50)
            .initial_delay(Duration::from_millis(100))
            .max_delay(cap)
            .strategy(strategy)
            .build();
        let mut rng = StdRng::seed_from_u64(11);
        for attempt in 2..50 {
            assert!(
                policy.delay_with_rng(attempt, &mut rng) <= cap,
                "{} exceeded cap at attempt {attempt}",
                strategy.as_str()
            );
        }
    }
}

#[test]
fn jitter_never_reduces_the_delay() {
    let policy = RetryPolicy::builder()
        .max_attempts(5)
        .exponential(Duration::from_millis(200))
        .jitter(true)
        .build();

    for _ in 0..100 {
        let delay = policy.delay_for_attempt(3);
        assert!(delay >= Duration::from_millis(400));
        assert!(delay <= Duration::from_millis(440));
    }
}
