use super::helpers::*;
use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .name("metrics_cb")
            .failure_threshold(2)
            .build(),
    );

    let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
    for _ in 0..3 {
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    }

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "open");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");
}
