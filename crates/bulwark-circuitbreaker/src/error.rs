use std::convert::Infallible;
use thiserror::Error;

/// Errors returned by [`CircuitBreaker`](crate::CircuitBreaker).
///
/// `E` is the protected operation's error type. Permit acquisition cannot
/// fail with an operation error, so it uses the default `Infallible`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError<E = Infallible> {
    /// The circuit is open, or half-open with its probe already in flight.
    #[error("circuit breaker '{name}' is open; call not permitted")]
    OpenCircuit {
        /// Breaker name.
        name: String,
    },

    /// The protected operation failed.
    #[error("operation failed: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the call was rejected by the breaker.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    /// Returns the operation error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::OpenCircuit { .. } => None,
        }
    }
}

impl CircuitBreakerError {
    /// Re-types a rejection so it can be returned from a call with operation error `E`.
    pub fn widen<E>(self) -> CircuitBreakerError<E> {
        match self {
            CircuitBreakerError::OpenCircuit { name } => CircuitBreakerError::OpenCircuit { name },
            CircuitBreakerError::Inner(never) => match never {},
        }
    }
}
