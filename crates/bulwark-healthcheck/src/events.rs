use crate::result::HealthStatus;
use bulwark_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`HealthCheckRegistry`](crate::HealthCheckRegistry).
#[derive(Debug, Clone)]
pub enum HealthCheckEvent {
    /// A probe finished.
    CheckCompleted {
        pattern_name: String,
        timestamp: Instant,
        check: String,
        healthy: bool,
        duration: Duration,
    },
    /// A check's status differs from its previous run.
    StatusChanged {
        pattern_name: String,
        timestamp: Instant,
        check: String,
        from: HealthStatus,
        to: HealthStatus,
    },
}

impl ResilienceEvent for HealthCheckEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HealthCheckEvent::CheckCompleted { .. } => "check_completed",
            HealthCheckEvent::StatusChanged { .. } => "status_changed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HealthCheckEvent::CheckCompleted { timestamp, .. }
            | HealthCheckEvent::StatusChanged { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            HealthCheckEvent::CheckCompleted { pattern_name, .. }
            | HealthCheckEvent::StatusChanged { pattern_name, .. } => pattern_name,
        }
    }
}
