use crate::registry::{HealthCheckRegistry, Inner};
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shorter intervals, including zero, are raised to this.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the background polling task of a [`HealthCheckRegistry`].
///
/// The task is aborted when the handle is stopped or dropped.
#[derive(Debug)]
pub struct PollerHandle {
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub(crate) fn spawn(registry: Weak<Inner>, interval: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(inner) = registry.upgrade() else {
                    break;
                };
                HealthCheckRegistry { inner }.run_checks().await;
            }
        });
        Self { task: Some(task) }
    }

    /// Returns true while the polling task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops polling.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
