use crate::events::HealthCheckEvent;
use crate::result::HealthStatus;
use bulwark_core::{EventListeners, FnListener, UNNAMED};
use std::time::Duration;

/// Configuration for a [`HealthCheckRegistry`](crate::HealthCheckRegistry).
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    pub(crate) probe_timeout: Duration,
    pub(crate) event_listeners: EventListeners<HealthCheckEvent>,
    pub(crate) name: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        HealthCheckConfigBuilder::new().build()
    }
}

impl HealthCheckConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> HealthCheckConfigBuilder {
        HealthCheckConfigBuilder::new()
    }

    /// Time a single probe may take before it counts as unhealthy.
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`HealthCheckConfig`].
pub struct HealthCheckConfigBuilder {
    probe_timeout: Duration,
    event_listeners: EventListeners<HealthCheckEvent>,
    name: String,
}

impl Default for HealthCheckConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheckConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - probe_timeout: 2s
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            probe_timeout: Duration::from_secs(2),
            event_listeners: EventListeners::new(),
            name: UNNAMED.to_string(),
        }
    }

    /// Sets how long a probe may run before it is abandoned and reported unhealthy.
    ///
    /// Default: 2 seconds
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the name used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback run after every probe with `(check, healthy)`.
    pub fn on_check_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &HealthCheckEvent| {
                if let HealthCheckEvent::CheckCompleted { check, healthy, .. } = event {
                    f(check, *healthy);
                }
            }));
        self
    }

    /// Registers a callback run when a check's status changes, with `(check, from, to)`.
    pub fn on_status_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, HealthStatus, HealthStatus) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &HealthCheckEvent| {
                if let HealthCheckEvent::StatusChanged {
                    check, from, to, ..
                } = event
                {
                    f(check, *from, *to);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HealthCheckConfig {
        HealthCheckConfig {
            probe_timeout: self.probe_timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
