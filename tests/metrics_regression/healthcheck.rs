use super::helpers::*;
use bulwark_healthcheck::{HealthCheckConfig, HealthCheckRegistry};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn healthcheck_metrics_exist() {
    init_recorder();

    let registry = HealthCheckRegistry::new(HealthCheckConfig::builder().name("metrics_health").build());
    registry.register_check("db", || async { Ok::<_, &str>(()) });
    registry.register_check("queue", || async { Err::<(), _>("lagging") });
    registry.run_checks().await;

    assert_counter_exists("healthcheck_probes_total");
    assert_metric_has_label("healthcheck_probes_total", "registry", "metrics_health");
    assert_metric_has_label("healthcheck_probes_total", "check", "db");
    assert_metric_has_label("healthcheck_probes_total", "result", "healthy");
    assert_metric_has_label("healthcheck_probes_total", "result", "unhealthy");

    assert_histogram_exists("healthcheck_probe_duration_seconds");
    assert_metric_has_label("healthcheck_probe_duration_seconds", "check", "queue");

    assert_gauge_exists("healthcheck_healthy");
    assert_metric_has_label("healthcheck_healthy", "registry", "metrics_health");
}
