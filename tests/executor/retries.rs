use super::{fast_retries, init_tracing};
use bulwark_executor::{ErrorKind, ResilienceError, ResilientExecutor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    init_tracing();
    let retries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&retries);
    let executor = ResilientExecutor::builder()
        .name("api")
        .retry_policy(fast_retries(3))
        .on_retry(move |op, attempt, delay| sink.lock().unwrap().push((op.to_string(), attempt, delay)))
        .build();

    let calls = AtomicUsize::new(0);
    let result = executor
        .execute("fetch_user", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= 2 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok("user-42")
                }
            }
        })
        .await;

    assert!(result.is_success());
    assert_eq!(result.value(), Some(&"user-42"));
    assert_eq!(result.attempts, 3);
    assert!(!result.used_fallback);
    assert_eq!(
        *retries.lock().unwrap(),
        vec![
            ("fetch_user".to_string(), 2, Duration::from_millis(20)),
            ("fetch_user".to_string(), 3, Duration::from_millis(30)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_without_fallback() {
    let exhausted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exhausted);
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(2))
        .on_retries_exhausted(move |_, attempts| {
            counter.store(attempts, Ordering::SeqCst);
        })
        .build();

    let result = executor
        .execute("charge", || async { Err::<(), _>("card declined") })
        .await;

    assert_eq!(result.attempts, 2);
    assert!(!result.used_fallback);
    assert_eq!(exhausted.load(Ordering::SeqCst), 2);
    match result.into_result() {
        Err(ResilienceError::RetriesExhausted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(last_error, "card declined");
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn registered_fallback_answers_after_exhaustion() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&applied);
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(2))
        .on_fallback(move |op, succeeded| sink.lock().unwrap().push((op.to_string(), succeeded)))
        .build();
    executor
        .fallbacks()
        .register_value::<_, &str>("recommendations", vec!["bestsellers"]);

    let result = executor
        .execute("recommendations", || async { Err::<Vec<&str>, _>("ranker down") })
        .await;

    assert!(result.used_fallback);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.into_value(), Some(vec!["bestsellers"]));
    assert_eq!(
        *applied.lock().unwrap(),
        vec![("recommendations".to_string(), true)]
    );
}

#[tokio::test(start_paused = true)]
async fn fallbacks_are_scoped_by_operation() {
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(1))
        .build();
    executor.fallbacks().register_value::<_, &str>("a", 1u32);

    let a = executor.execute("a", || async { Err::<u32, _>("boom") }).await;
    let b = executor.execute("b", || async { Err::<u32, _>("boom") }).await;

    assert_eq!(a.into_value(), Some(1));
    assert_eq!(
        b.error().map(|error| error.kind()),
        Some(ErrorKind::RetriesExhausted)
    );
}

#[tokio::test(start_paused = true)]
async fn non_retryable_errors_stop_immediately() {
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(5))
        .build();

    let calls = AtomicUsize::new(0);
    let result = executor
        .execute_with_predicate(
            "parse",
            |error: &&str| *error != "invalid input",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("invalid input") }
            },
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.error().and_then(|error| error.operation_error()), Some(&"invalid input"));
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_attempts_and_delays() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&timeouts);
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(10))
        .on_timeout(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    executor.fallbacks().register_value::<_, &str>("slow", "cached");

    let result = executor
        .execute_with_timeout(
            "slow",
            || async {
                tokio::time::sleep(Duration::from_millis(45)).await;
                Err::<&str, _>("upstream timeout")
            },
            Duration::from_millis(100),
        )
        .await;

    assert!(!result.used_fallback);
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    assert!(matches!(
        result.outcome,
        Err(ResilienceError::Timeout { deadline }) if deadline == Duration::from_millis(100)
    ));
}

#[tokio::test(start_paused = true)]
async fn per_operation_policy_overrides_default() {
    let executor = ResilientExecutor::builder()
        .retry_policy(fast_retries(2))
        .build();
    executor.retry_policy_for("critical", fast_retries(4));

    let critical = executor
        .execute("critical", || async { Err::<(), _>("down") })
        .await;
    let routine = executor
        .execute("routine", || async { Err::<(), _>("down") })
        .await;

    assert_eq!(critical.attempts, 4);
    assert_eq!(routine.attempts, 2);
}
