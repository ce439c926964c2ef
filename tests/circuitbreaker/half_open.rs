use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::time::Duration;

fn tripped(successes_required: usize) -> CircuitBreaker {
    let cb = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("half-open")
            .failure_threshold(1)
            .recovery_timeout(Duration::from_secs(10))
            .half_open_successes_required(successes_required)
            .build(),
    );
    let permit = cb.try_acquire().unwrap();
    assert!(permit.failure());
    cb
}

#[tokio::test(start_paused = true)]
async fn stays_open_until_recovery_timeout() {
    let cb = tripped(1);

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert!(cb.try_acquire().is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;
    let probe = cb.try_acquire().unwrap();
    assert!(probe.is_probe());
    assert_eq!(cb.state_sync(), CircuitState::HalfOpen);
    probe.success();
    assert_eq!(cb.state_sync(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn admits_exactly_one_probe() {
    let cb = tripped(1);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let probe = cb.try_acquire().unwrap();
    for _ in 0..5 {
        assert!(cb.try_acquire().unwrap_err().is_circuit_open());
    }
    assert!(cb.metrics().probe_in_flight);
    drop(probe);

    // an abandoned probe frees the slot without recording anything
    assert_eq!(cb.state_sync(), CircuitState::HalfOpen);
    assert!(cb.try_acquire().is_ok());
}

#[tokio::test(start_paused = true)]
async fn failed_probe_reopens_and_restarts_the_timer() {
    let cb = tripped(1);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let probe = cb.try_acquire().unwrap();
    assert!(probe.failure());
    assert_eq!(cb.state_sync(), CircuitState::Open);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(cb.try_acquire().is_err());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(cb.try_acquire().is_ok());
}

#[tokio::test(start_paused = true)]
async fn several_probe_successes_can_be_required() {
    let cb = tripped(2);
    tokio::time::sleep(Duration::from_secs(10)).await;

    cb.try_acquire().unwrap().success();
    assert_eq!(cb.state_sync(), CircuitState::HalfOpen);
    assert_eq!(cb.metrics().half_open_successes, 1);

    cb.try_acquire().unwrap().success();
    assert_eq!(cb.state_sync(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn permit_from_an_earlier_half_open_period_is_ignored() {
    let cb = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .recovery_timeout(Duration::from_secs(1))
            .build(),
    );

    cb.force_open();
    tokio::time::advance(Duration::from_secs(1)).await;
    let abandoned = cb.try_acquire().unwrap();

    cb.force_open();
    tokio::time::advance(Duration::from_secs(1)).await;
    let current = cb.try_acquire().unwrap();

    drop(abandoned);
    assert!(cb.try_acquire().is_err());

    current.success();
    assert_eq!(cb.state_sync(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn late_outcome_from_an_earlier_period_counts_for_nothing() {
    let cb = tripped(2);
    tokio::time::advance(Duration::from_secs(10)).await;
    let late = cb.try_acquire().unwrap();

    cb.force_open();
    tokio::time::advance(Duration::from_secs(10)).await;
    let current = cb.try_acquire().unwrap();

    late.success();
    assert_eq!(cb.metrics().half_open_successes, 0);
    assert!(cb.try_acquire().is_err());

    assert!(current.failure());
    assert_eq!(cb.state_sync(), CircuitState::Open);
}
