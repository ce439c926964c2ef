use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    Closed = 0,
    /// Calls are rejected until the recovery timeout elapses.
    Open = 1,
    /// One probe call at a time is allowed to test recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time snapshot of a breaker, taken under its lock.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures counted while closed.
    pub failure_count: usize,
    /// Successful probes counted while half-open.
    pub half_open_successes: usize,
    /// Whether a half-open probe is currently in flight.
    pub probe_in_flight: bool,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
    /// Time since the last failure that opened (or kept open) the circuit.
    pub time_since_last_failure: Option<Duration>,
}

/// Breaker state. Only ever touched under the breaker's mutex.
pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    half_open_successes: usize,
    last_failure_time: Option<Instant>,
    last_state_change: Instant,
    probe_in_flight: bool,
    /// Bumped on every transition; half-open permits carry the value they were issued under.
    cycle: u64,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            last_failure_time: None,
            last_state_change: Instant::now(),
            probe_in_flight: false,
            cycle: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            failure_count: self.failure_count,
            half_open_successes: self.half_open_successes,
            probe_in_flight: self.probe_in_flight,
            time_since_state_change: self.last_state_change.elapsed(),
            time_since_last_failure: self.last_failure_time.map(|t| t.elapsed()),
        }
    }

    /// Decides whether a call may proceed.
    ///
    /// `None` rejects the call. `Some(None)` admits an ordinary call and
    /// `Some(Some(cycle))` admits the half-open trial call of that cycle.
    pub(crate) fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) -> Option<Option<u64>> {
        if self.state == CircuitState::Open && self.recovery_elapsed(config) {
            self.transition_to(CircuitState::HalfOpen, config, mirror, events);
        }

        let permit = match self.state {
            CircuitState::Closed => Some(None),
            CircuitState::Open => None,
            CircuitState::HalfOpen if self.probe_in_flight => None,
            CircuitState::HalfOpen => {
                self.probe_in_flight = true;
                Some(Some(self.cycle))
            }
        };

        let timestamp = std::time::Instant::now();
        match permit {
            Some(_) => events.push(CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp,
                state: self.state,
            }),
            None => {
                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);
                events.push(CircuitBreakerEvent::CallRejected {
                    pattern_name: config.name.clone(),
                    timestamp,
                    state: self.state,
                });
            }
        }
        permit
    }

    pub(crate) fn record_success(
        &mut self,
        half_open_cycle: Option<u64>,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);
        events.push(CircuitBreakerEvent::SuccessRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
        });

        match self.state {
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::HalfOpen if self.is_current(half_open_cycle) => {
                self.probe_in_flight = false;
                self.half_open_successes += 1;
                if self.half_open_successes >= config.half_open_successes_required {
                    self.transition_to(CircuitState::Closed, config, mirror, events);
                }
            }
            // Calls admitted in Closed or in an earlier half-open cycle count for nothing here.
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    /// Returns true if this failure moved the circuit to Open.
    pub(crate) fn record_failure(
        &mut self,
        half_open_cycle: Option<u64>,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) -> bool {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);
        events.push(CircuitBreakerEvent::FailureRecorded {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
        });

        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                self.last_failure_time = Some(Instant::now());
                if self.failure_count >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config, mirror, events);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen if self.is_current(half_open_cycle) => {
                self.probe_in_flight = false;
                self.last_failure_time = Some(Instant::now());
                self.transition_to(CircuitState::Open, config, mirror, events);
                true
            }
            CircuitState::HalfOpen | CircuitState::Open => false,
        }
    }

    /// Frees the half-open slot held by a permit dropped without an outcome.
    /// A permit from an earlier cycle holds nothing.
    pub(crate) fn release_slot(&mut self, cycle: u64) {
        if self.state == CircuitState::HalfOpen && self.cycle == cycle {
            self.probe_in_flight = false;
        }
    }

    fn is_current(&self, half_open_cycle: Option<u64>) -> bool {
        half_open_cycle == Some(self.cycle)
    }

    pub(crate) fn force_open(
        &mut self,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        self.last_failure_time = Some(Instant::now());
        self.transition_to(CircuitState::Open, config, mirror, events);
    }

    pub(crate) fn reset(
        &mut self,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        self.transition_to(CircuitState::Closed, config, mirror, events);
        self.failure_count = 0;
        self.last_failure_time = None;
    }

    fn recovery_elapsed(&self, config: &CircuitBreakerConfig) -> bool {
        self.last_failure_time
            .map_or(true, |t| t.elapsed() >= config.recovery_timeout)
    }

    fn transition_to(
        &mut self,
        to: CircuitState,
        config: &CircuitBreakerConfig,
        mirror: &AtomicU8,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        if self.state == to {
            return;
        }
        let from = self.state;

        #[cfg(feature = "tracing")]
        tracing::info!(
            circuitbreaker = %config.name,
            from = from.as_str(),
            to = to.as_str(),
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(f64::from(to as u8));
        }

        events.push(CircuitBreakerEvent::StateTransition {
            pattern_name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            from_state: from,
            to_state: to,
        });

        self.state = to;
        self.cycle = self.cycle.wrapping_add(1);
        mirror.store(to as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.half_open_successes = 0;
        self.probe_in_flight = false;
        if to == CircuitState::Closed {
            self.failure_count = 0;
        }
    }
}
