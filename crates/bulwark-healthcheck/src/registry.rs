use crate::config::HealthCheckConfig;
use crate::events::HealthCheckEvent;
use crate::poller::PollerHandle;
use crate::probe::HealthProbe;
use crate::result::{HealthCheckResult, HealthReport, HealthStatus};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

pub(crate) struct Inner {
    config: HealthCheckConfig,
    probes: RwLock<BTreeMap<String, Arc<dyn HealthProbe>>>,
    results: RwLock<BTreeMap<String, HealthCheckResult>>,
}

/// Holds named probes and aggregates their latest results.
///
/// Cloning is cheap; clones share probes and results.
///
/// ```
/// use bulwark_healthcheck::HealthCheckRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = HealthCheckRegistry::default();
/// registry.register_check("database", || async { Ok::<(), String>(()) });
/// registry.register_check("model", || async { Err::<(), _>("endpoint unreachable") });
///
/// let results = registry.run_checks().await;
/// assert!(results["database"].healthy);
/// assert_eq!(results["model"].last_error.as_deref(), Some("endpoint unreachable"));
/// assert!(!registry.is_healthy());
/// # }
/// ```
#[derive(Clone)]
pub struct HealthCheckRegistry {
    pub(crate) inner: Arc<Inner>,
}

impl Default for HealthCheckRegistry {
    fn default() -> Self {
        Self::new(HealthCheckConfig::default())
    }
}

impl fmt::Debug for HealthCheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheckRegistry")
            .field("name", &self.inner.config.name)
            .field("checks", &self.check_names())
            .finish()
    }
}

impl HealthCheckRegistry {
    /// Creates an empty registry.
    pub fn new(config: HealthCheckConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                probes: RwLock::new(BTreeMap::new()),
                results: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Registers `probe` under `name`, replacing (and forgetting the results
    /// of) any probe already registered under that name.
    pub fn register_check<S, P>(&self, name: S, probe: P)
    where
        S: Into<String>,
        P: HealthProbe + 'static,
    {
        let name = name.into();
        let mut probes = self.inner.probes.write();
        self.inner.results.write().remove(&name);
        probes.insert(name, Arc::new(probe));
    }

    /// Removes a check and its results. Returns true if it was registered.
    pub fn unregister_check(&self, name: &str) -> bool {
        let mut probes = self.inner.probes.write();
        self.inner.results.write().remove(name);
        probes.remove(name).is_some()
    }

    /// Names of registered checks, sorted.
    pub fn check_names(&self) -> Vec<String> {
        self.inner.probes.read().keys().cloned().collect()
    }

    /// Runs every registered probe concurrently and returns the fresh results.
    ///
    /// Each probe runs on its own task under the configured timeout. A probe
    /// that fails, panics or times out is reported unhealthy; the others are
    /// unaffected. Must be called from within a tokio runtime.
    pub async fn run_checks(&self) -> BTreeMap<String, HealthCheckResult> {
        let probes: Vec<(String, Arc<dyn HealthProbe>)> = self
            .inner
            .probes
            .read()
            .iter()
            .map(|(name, probe)| (name.clone(), Arc::clone(probe)))
            .collect();

        let runs = probes
            .into_iter()
            .map(|(name, probe)| run_probe(name, probe, self.inner.config.probe_timeout));
        let results = futures::future::join_all(runs).await;

        let mut events = Vec::new();
        let fresh = {
            let probes = self.inner.probes.read();
            let mut stored = self.inner.results.write();
            let mut fresh = BTreeMap::new();
            for result in results {
                // unregistered while running
                if !probes.contains_key(&result.name) {
                    continue;
                }
                let previous = stored
                    .get(&result.name)
                    .map_or(HealthStatus::Unknown, HealthCheckResult::status);
                self.collect_events(&result, previous, &mut events);
                stored.insert(result.name.clone(), result.clone());
                fresh.insert(result.name.clone(), result);
            }
            fresh
        };

        for event in &events {
            self.inner.config.event_listeners.emit(event);
        }

        #[cfg(feature = "metrics")]
        gauge!("healthcheck_healthy", "registry" => self.inner.config.name.clone())
            .set(if self.is_healthy() { 1.0 } else { 0.0 });

        fresh
    }

    fn collect_events(
        &self,
        result: &HealthCheckResult,
        previous: HealthStatus,
        events: &mut Vec<HealthCheckEvent>,
    ) {
        let name = &self.inner.config.name;

        #[cfg(feature = "metrics")]
        {
            counter!("healthcheck_probes_total", "registry" => name.clone(), "check" => result.name.clone(), "result" => result.status().as_str())
                .increment(1);
            histogram!("healthcheck_probe_duration_seconds", "registry" => name.clone(), "check" => result.name.clone())
                .record(result.duration.as_secs_f64());
        }

        events.push(HealthCheckEvent::CheckCompleted {
            pattern_name: name.clone(),
            timestamp: Instant::now(),
            check: result.name.clone(),
            healthy: result.healthy,
            duration: result.duration,
        });

        let current = result.status();
        if current != previous {
            #[cfg(feature = "tracing")]
            tracing::info!(
                registry = %name,
                check = %result.name,
                from = previous.as_str(),
                to = current.as_str(),
                error = result.last_error.as_deref().unwrap_or(""),
                "health status changed"
            );
            events.push(HealthCheckEvent::StatusChanged {
                pattern_name: name.clone(),
                timestamp: Instant::now(),
                check: result.name.clone(),
                from: previous,
                to: current,
            });
        }
    }

    /// AND over the latest results of every registered check.
    ///
    /// A registered check that has never run counts as unhealthy. With no
    /// checks registered the registry is healthy.
    pub fn is_healthy(&self) -> bool {
        let probes = self.inner.probes.read();
        let results = self.inner.results.read();
        probes
            .keys()
            .all(|name| results.get(name).is_some_and(|r| r.healthy))
    }

    /// Latest result of one check.
    pub fn result(&self, name: &str) -> Option<HealthCheckResult> {
        self.inner.results.read().get(name).cloned()
    }

    /// Overall health plus the latest result of every check.
    pub fn report(&self) -> HealthReport {
        let probes = self.inner.probes.read();
        let results = self.inner.results.read();
        let mut checks = BTreeMap::new();
        let mut pending = Vec::new();
        for name in probes.keys() {
            match results.get(name) {
                Some(result) => {
                    checks.insert(name.clone(), result.clone());
                }
                None => pending.push(name.clone()),
            }
        }
        let healthy = pending.is_empty() && checks.values().all(|r| r.healthy);
        HealthReport {
            healthy,
            checks,
            pending,
        }
    }

    /// Spawns a task that calls [`run_checks`](Self::run_checks) every
    /// `interval`, starting immediately.
    ///
    /// The task ends when the returned handle is stopped or dropped, or once
    /// every handle to the registry is gone. Must be called from within a
    /// tokio runtime.
    ///
    /// An interval shorter than 1ms, including zero, is treated as 1ms.
    pub fn spawn_poller(&self, interval: Duration) -> PollerHandle {
        PollerHandle::spawn(Arc::downgrade(&self.inner), interval)
    }
}

async fn run_probe(
    name: String,
    probe: Arc<dyn HealthProbe>,
    timeout: Duration,
) -> HealthCheckResult {
    let last_run_at = SystemTime::now();
    let started = tokio::time::Instant::now();
    let task = tokio::spawn(async move { tokio::time::timeout(timeout, probe.check()).await });

    let outcome = match task.await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(message))) => Err(message),
        Ok(Err(_elapsed)) => Err(format!("probe timed out after {timeout:?}")),
        Err(join_error) if join_error.is_panic() => Err("probe panicked".to_string()),
        Err(_) => Err("probe was cancelled".to_string()),
    };

    #[cfg(feature = "tracing")]
    if let Err(message) = &outcome {
        tracing::warn!(check = %name, error = %message, "health probe failed");
    }

    HealthCheckResult {
        name,
        healthy: outcome.is_ok(),
        last_run_at,
        duration: started.elapsed(),
        last_error: outcome.err(),
    }
}
