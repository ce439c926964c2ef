use super::fast_retries;
use bulwark_circuitbreaker::{CircuitBreakerConfig, CircuitState};
use bulwark_executor::{ResilienceError, ResilientExecutor};
use bulwark_retry::RetryPolicy;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn tripping_executor() -> ResilientExecutor {
    ResilientExecutor::builder()
        .retry_policy(RetryPolicy::no_retry())
        .breaker_config(
            CircuitBreakerConfig::builder()
                .failure_threshold(2)
                .recovery_timeout(Duration::from_secs(5))
                .build(),
        )
        .build()
}

#[tokio::test(start_paused = true)]
async fn open_circuit_rejects_without_calling() {
    let rejected = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rejected);
    let executor = ResilientExecutor::builder()
        .retry_policy(RetryPolicy::no_retry())
        .breaker_config(CircuitBreakerConfig::builder().failure_threshold(2).build())
        .on_rejected(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let calls = AtomicUsize::new(0);
    let failing = || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>("refused") }
    };

    let first = executor.execute("db", failing).await;
    assert!(first.error().is_some_and(|error| error.is_retries_exhausted()));
    let second = executor.execute("db", failing).await;
    assert!(second.error().is_some_and(|error| error.is_circuit_open()));

    let third = executor.execute("db", failing).await;
    assert_eq!(third.attempts, 0);
    assert!(matches!(
        third.outcome,
        Err(ResilienceError::CircuitOpen { ref name }) if name == "db"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn breakers_are_isolated_per_operation() {
    let executor = tripping_executor();
    for _ in 0..2 {
        executor
            .execute("payments", || async { Err::<(), _>("down") })
            .await;
    }

    let search = executor.execute("search", || async { Ok::<_, ()>(7) }).await;
    assert_eq!(search.into_value(), Some(7));

    let states = executor.breaker_states();
    assert_eq!(states["payments"], CircuitState::Open);
    assert_eq!(states["search"], CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn tripping_failure_skips_the_fallback() {
    let executor = tripping_executor();
    executor.fallbacks().register_value::<_, &str>("quotes", 0u64);

    let first = executor
        .execute("quotes", || async { Err::<u64, _>("stale feed") })
        .await;
    assert_eq!(first.into_value(), Some(0));

    let second = executor
        .execute("quotes", || async { Err::<u64, _>("stale feed") })
        .await;
    assert!(!second.used_fallback);
    assert!(second.error().is_some_and(|error| error.is_circuit_open()));
}

#[tokio::test(start_paused = true)]
async fn recovers_after_timeout_and_reset() {
    let executor = tripping_executor();
    for _ in 0..2 {
        executor
            .execute("inventory", || async { Err::<(), _>("down") })
            .await;
    }
    assert_eq!(executor.breaker("inventory").state_sync(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(6)).await;
    let probe = executor
        .execute("inventory", || async { Ok::<_, &str>("restocked") })
        .await;
    assert_eq!(probe.into_value(), Some("restocked"));
    assert_eq!(executor.breaker("inventory").state_sync(), CircuitState::Closed);

    executor.breaker("inventory").force_open();
    assert!(executor.reset_breaker("inventory"));
    assert!(!executor.reset_breaker("unknown"));
    assert_eq!(executor.breaker_states()["inventory"], CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn per_operation_breaker_config() {
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(1))
        .build();
    executor.breaker_config_for(
        "fragile",
        CircuitBreakerConfig::builder().failure_threshold(1).build(),
    );

    let fragile = executor
        .execute("fragile", || async { Err::<(), _>("x") })
        .await;
    let sturdy = executor
        .execute("sturdy", || async { Err::<(), _>("x") })
        .await;

    assert!(fragile.error().is_some_and(|error| error.is_circuit_open()));
    assert!(sturdy.error().is_some_and(|error| error.is_retries_exhausted()));
    assert_eq!(executor.breaker("fragile").name(), "fragile");
}

async fn crash() -> Result<u32, &'static str> {
    panic!("ledger corrupted")
}

#[tokio::test(start_paused = true)]
async fn panicking_operation_trips_the_breaker() {
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(3))
        .breaker_config(CircuitBreakerConfig::builder().failure_threshold(1).build())
        .build();

    let handle = tokio::spawn({
        let executor = executor.clone();
        async move { executor.execute("ledger", crash).await }
    });
    let result = handle.await.expect("panic escaped the executor");

    assert_eq!(result.attempts, 1);
    assert!(result.error().is_some_and(|error| error.is_panicked()));
    assert_eq!(executor.breaker_states()["ledger"], CircuitState::Open);

    let next = executor.execute("ledger", || async { Ok::<_, &str>(1) }).await;
    assert!(next.error().is_some_and(|error| error.is_circuit_open()));
}

#[tokio::test(start_paused = true)]
async fn panics_are_reported_and_counted() {
    let panics = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&panics);
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(3))
        .breaker_config(CircuitBreakerConfig::builder().failure_threshold(3).build())
        .on_panic(move |operation, message| {
            assert_eq!(operation, "ledger");
            assert_eq!(message, "ledger corrupted");
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    executor.fallbacks().register_value::<_, &str>("ledger", 0u32);

    for _ in 0..2 {
        let result = executor.execute("ledger", crash).await;
        assert!(!result.used_fallback);
        assert!(matches!(
            result.outcome,
            Err(ResilienceError::Panicked { attempts: 1, ref message }) if message == "ledger corrupted"
        ));
    }
    assert_eq!(panics.load(Ordering::SeqCst), 2);
    assert_eq!(executor.breaker("ledger").metrics().failure_count, 2);
    assert_eq!(executor.breaker_states()["ledger"], CircuitState::Closed);

    executor.execute("ledger", crash).await;
    assert_eq!(executor.breaker_states()["ledger"], CircuitState::Open);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_operations_do_not_interfere() {
    let executor = ResilientExecutor::builder()
        .retry_policy(RetryPolicy::no_retry())
        .breaker_config(CircuitBreakerConfig::builder().failure_threshold(3).build())
        .build();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let executor = executor.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                executor
                    .execute("healthy", || async { Ok::<_, &str>(i) })
                    .await
                    .is_success()
            } else {
                executor
                    .execute("broken", || async { Err::<u32, _>("nope") })
                    .await
                    .is_success()
            }
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 20);
    let states = executor.breaker_states();
    assert_eq!(states["healthy"], CircuitState::Closed);
    assert_eq!(states["broken"], CircuitState::Open);
}
