use bulwark_healthcheck::{HealthCheckConfig, HealthCheckRegistry, HealthStatus};
use std::time::Duration;

fn registry() -> HealthCheckRegistry {
    HealthCheckRegistry::new(
        HealthCheckConfig::builder()
            .name("isolation")
            .probe_timeout(Duration::from_secs(2))
            .build(),
    )
}

#[tokio::test]
async fn empty_registry_is_healthy() {
    let registry = registry();
    assert!(registry.run_checks().await.is_empty());
    assert!(registry.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn one_bad_probe_does_not_affect_the_others() {
    let registry = registry();
    registry.register_check("database", || async { Ok::<(), String>(()) });
    registry.register_check("cache", || async {
        Err::<(), _>("connection refused".to_string())
    });
    registry.register_check("buggy", || async {
        if true {
            panic!("probe bug");
        }
        Ok::<(), String>(())
    });
    registry.register_check("hung", || async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<(), String>(())
    });

    let results = registry.run_checks().await;
    assert_eq!(results.len(), 4);
    assert!(results["database"].healthy);
    assert_eq!(
        results["cache"].last_error.as_deref(),
        Some("connection refused")
    );
    assert!(!results["buggy"].healthy);
    assert!(!results["hung"].healthy);
    assert!(results["hung"].duration >= Duration::from_secs(2));

    assert!(!registry.is_healthy());
    let report = registry.report();
    let mut failing = report.failing();
    failing.sort_unstable();
    assert_eq!(failing, vec!["buggy", "cache", "hung"]);
}

#[tokio::test]
async fn never_run_checks_are_pending() {
    let registry = registry();
    registry.register_check("database", || async { Ok::<(), String>(()) });

    assert!(!registry.is_healthy());
    let report = registry.report();
    assert!(!report.healthy);
    assert_eq!(report.pending, vec!["database".to_string()]);

    registry.run_checks().await;
    assert!(registry.is_healthy());
    assert_eq!(
        registry.result("database").map(|r| r.status()),
        Some(HealthStatus::Healthy)
    );
}

#[tokio::test]
async fn unregistering_drops_results() {
    let registry = registry();
    registry.register_check("a", || async { Err::<(), _>("down") });
    registry.register_check("b", || async { Ok::<(), &str>(()) });
    registry.run_checks().await;
    assert!(!registry.is_healthy());

    assert!(registry.unregister_check("a"));
    assert!(registry.result("a").is_none());
    assert_eq!(registry.check_names(), vec!["b".to_string()]);
    assert!(registry.is_healthy());
}
