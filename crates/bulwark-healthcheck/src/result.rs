use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Health of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HealthStatus {
    /// The check has not run yet.
    Unknown,
    /// The last run passed.
    Healthy,
    /// The last run failed, panicked or timed out.
    Unhealthy,
}

impl HealthStatus {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Latest outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthCheckResult {
    /// Check name.
    pub name: String,
    /// Whether the probe passed.
    pub healthy: bool,
    /// Wall-clock time the probe was started.
    pub last_run_at: SystemTime,
    /// How long the probe took (or the timeout, if it hung).
    pub duration: Duration,
    /// The probe's error message, or a description of the panic or timeout.
    pub last_error: Option<String>,
}

impl HealthCheckResult {
    /// `Healthy` or `Unhealthy`.
    pub fn status(&self) -> HealthStatus {
        if self.healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Registry-wide health summary.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthReport {
    /// AND over every registered check. Checks that never ran count as unhealthy.
    pub healthy: bool,
    /// Latest result per check that has run at least once.
    pub checks: BTreeMap<String, HealthCheckResult>,
    /// Registered checks that have not run yet.
    pub pending: Vec<String>,
}

impl HealthReport {
    /// Names of checks whose latest run failed.
    pub fn failing(&self) -> Vec<&str> {
        self.checks
            .values()
            .filter(|r| !r.healthy)
            .map(|r| r.name.as_str())
            .collect()
    }
}
