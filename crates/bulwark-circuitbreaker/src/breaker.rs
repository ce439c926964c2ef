use crate::circuit::{Circuit, CircuitMetrics, CircuitState};
use crate::config::CircuitBreakerConfig;
use crate::error::CircuitBreakerError;
use crate::events::CircuitBreakerEvent;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

struct Shared {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
    state: AtomicU8,
}

/// A cheaply cloneable handle to one circuit breaker.
///
/// Every clone observes and updates the same state. Events are delivered to
/// listeners after the internal lock has been released, so listeners may call
/// back into the breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.config.name)
            .field("state", &self.state_sync())
            .finish()
    }
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                circuit: Mutex::new(Circuit::new()),
                state: AtomicU8::new(CircuitState::Closed as u8),
            }),
        }
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this breaker was built with.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.shared.config
    }

    /// Asks for permission to make one call.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// here, and the caller receives the single probe permit. While that probe
    /// is in flight every other caller is rejected.
    pub fn try_acquire(&self) -> Result<CallPermit, CircuitBreakerError> {
        let mut events = Vec::new();
        let permit = {
            let mut circuit = self.shared.circuit.lock();
            circuit.try_acquire(&self.shared.config, &self.shared.state, &mut events)
        };
        self.emit(&events);

        match permit {
            Some(half_open_cycle) => Ok(CallPermit {
                breaker: self.clone(),
                half_open_cycle,
                settled: false,
            }),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(circuitbreaker = %self.shared.config.name, "call rejected");
                Err(CircuitBreakerError::OpenCircuit {
                    name: self.shared.config.name.clone(),
                })
            }
        }
    }

    /// Runs `operation` if the breaker permits it and records its outcome.
    ///
    /// A rejected call never invokes `operation`.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire().map_err(CircuitBreakerError::widen)?;
        match operation().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(error) => {
                permit.failure();
                Err(CircuitBreakerError::Inner(error))
            }
        }
    }

    /// Current state, read under the lock.
    pub fn state(&self) -> CircuitState {
        self.shared.circuit.lock().state()
    }

    /// Current state, read from an atomic mirror without locking.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns true if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    /// Snapshot of the breaker's counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.shared.circuit.lock().metrics()
    }

    /// `"healthy"`, `"degraded"` or `"unhealthy"` for closed, half-open and
    /// open circuits respectively.
    pub fn health_status(&self) -> &'static str {
        match self.state_sync() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }

    /// Closes the circuit and clears all counters.
    pub fn reset(&self) {
        let mut events = Vec::new();
        self.shared
            .circuit
            .lock()
            .reset(&self.shared.config, &self.shared.state, &mut events);
        self.emit(&events);
    }

    /// Opens the circuit as if the failure threshold had just been reached.
    pub fn force_open(&self) {
        let mut events = Vec::new();
        self.shared
            .circuit
            .lock()
            .force_open(&self.shared.config, &self.shared.state, &mut events);
        self.emit(&events);
    }

    fn emit(&self, events: &[CircuitBreakerEvent]) {
        for event in events {
            self.shared.config.event_listeners.emit(event);
        }
    }
}

/// Permission to make one call through a [`CircuitBreaker`].
///
/// Report the outcome with [`success`](CallPermit::success) or
/// [`failure`](CallPermit::failure). A permit dropped without an outcome, for
/// example when the call's future is cancelled, records nothing and frees the
/// half-open probe slot it may hold.
///
/// A half-open permit belongs to the half-open period it was issued in. Once
/// the circuit has transitioned again, its outcome and its drop are ignored.
#[must_use = "the call outcome must be reported through the permit"]
pub struct CallPermit {
    breaker: CircuitBreaker,
    half_open_cycle: Option<u64>,
    settled: bool,
}

impl fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.name())
            .field("probe", &self.is_probe())
            .finish()
    }
}

impl CallPermit {
    /// Returns true if this permit is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.half_open_cycle.is_some()
    }

    /// Records a successful call.
    pub fn success(mut self) {
        self.settled = true;
        let shared = &self.breaker.shared;
        let mut events = Vec::new();
        shared
            .circuit
            .lock()
            .record_success(self.half_open_cycle, &shared.config, &shared.state, &mut events);
        self.breaker.emit(&events);
    }

    /// Records a failed call. Returns true if this failure opened the circuit.
    pub fn failure(mut self) -> bool {
        self.settled = true;
        let shared = &self.breaker.shared;
        let mut events = Vec::new();
        let tripped = shared
            .circuit
            .lock()
            .record_failure(self.half_open_cycle, &shared.config, &shared.state, &mut events);
        self.breaker.emit(&events);
        tripped
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if let (Some(cycle), false) = (self.half_open_cycle, self.settled) {
            self.breaker.shared.circuit.lock().release_slot(cycle);
        }
    }
}
