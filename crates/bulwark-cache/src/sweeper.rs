use crate::cache::{Inner, SmartCache};
use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shorter intervals, including zero, are raised to this.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the background sweeper task of a [`SmartCache`].
///
/// The task is aborted when the handle is stopped or dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub(crate) fn spawn<K, V>(cache: Weak<Inner<K, V>>, interval: Duration) -> Self
    where
        K: Hash + Eq + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = cache.upgrade() else {
                    break;
                };
                let purged = SmartCache { inner }.purge_expired();
                #[cfg(feature = "tracing")]
                if purged > 0 {
                    tracing::debug!(purged, "sweeper purged expired entries");
                }
                #[cfg(not(feature = "tracing"))]
                let _ = purged;
            }
        });
        Self { task: Some(task) }
    }

    /// Returns true while the sweeper task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the sweeper.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
