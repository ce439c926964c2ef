//! Health check registry for bulwark.
//!
//! A [`HealthCheckRegistry`] holds named [`HealthProbe`]s, typically one per
//! protected dependency. [`HealthCheckRegistry::run_checks`] runs them all
//! with per-probe isolation: each probe runs on its own task under a timeout,
//! so a failing, panicking or hung probe is reported unhealthy without
//! affecting the rest. The latest result per check is kept and
//! [`HealthCheckRegistry::is_healthy`] AND-reduces them for a liveness
//! endpoint.
//!
//! [`HealthCheckRegistry::spawn_poller`] runs the checks periodically in the
//! background.
//!
//! # Feature flags
//!
//! - `tracing`: log probe failures and status changes
//! - `metrics`: `healthcheck_probes_total`, `healthcheck_probe_duration_seconds`
//!   and the `healthcheck_healthy` gauge
//! - `serde`: derive `Serialize`/`Deserialize` on results and reports

mod config;
mod events;
mod poller;
mod probe;
mod registry;
mod result;

pub use config::{HealthCheckConfig, HealthCheckConfigBuilder};
pub use events::HealthCheckEvent;
pub use poller::PollerHandle;
pub use probe::HealthProbe;
pub use registry::HealthCheckRegistry;
pub use result::{HealthCheckResult, HealthReport, HealthStatus};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "healthcheck_probes_total",
            "Total number of health probe runs by result"
        );
        metrics::describe_histogram!(
            "healthcheck_probe_duration_seconds",
            "Duration of health probe runs"
        );
        metrics::describe_gauge!(
            "healthcheck_healthy",
            "1 when every registered check passed its latest run, otherwise 0"
        );
    });
}
