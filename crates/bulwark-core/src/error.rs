//! The error taxonomy shared by bulwark components.
//!
//! A protected call can end in one of a small number of ways. Callers get a
//! [`ResilienceError`] that says which one, so "failed after retries" can be
//! told apart from "temporarily unavailable because the circuit is open":
//!
//! ```rust
//! use bulwark_core::{ErrorKind, ResilienceError};
//!
//! fn describe(err: &ResilienceError<std::io::Error>) -> &'static str {
//!     match err.kind() {
//!         ErrorKind::CircuitOpen => "dependency unavailable, try later",
//!         ErrorKind::Timeout => "took too long",
//!         ErrorKind::RetriesExhausted | ErrorKind::Fallback => "failed",
//!         ErrorKind::Panicked => "bug in the operation",
//!         ErrorKind::Transient => unreachable!("transient failures never leave the retry loop"),
//!     }
//! }
//!
//! let err: ResilienceError<std::io::Error> = ResilienceError::CircuitOpen {
//!     name: "inventory".to_string(),
//! };
//! assert_eq!(describe(&err), "dependency unavailable, try later");
//! ```

use std::time::Duration;
use thiserror::Error;

/// Classification of failures, including the per-attempt [`ErrorKind::Transient`]
/// class that is consumed by the retry loop and never returned as a final error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An attempt failed and retrying is appropriate.
    Transient,
    /// The call was short-circuited without being attempted.
    CircuitOpen,
    /// All attempts failed and no fallback was registered.
    RetriesExhausted,
    /// The fallback itself failed.
    Fallback,
    /// The overall deadline elapsed.
    Timeout,
    /// An attempt panicked.
    Panicked,
}

impl ErrorKind {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::RetriesExhausted => "retries_exhausted",
            ErrorKind::Fallback => "fallback_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Panicked => "panicked",
        }
    }
}

/// Final error of a protected call.
///
/// `E` is the error type of the caller's operation.
#[derive(Debug, Clone, Error)]
pub enum ResilienceError<E> {
    /// The circuit breaker for the operation is open; nothing was attempted.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Operation (breaker) name.
        name: String,
    },

    /// Every attempt failed and no fallback was registered.
    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Error returned by the final attempt.
        last_error: E,
    },

    /// The registered fallback failed; its error replaces the original one.
    #[error("fallback failed: {error}")]
    Fallback {
        /// Error returned by the fallback.
        error: E,
    },

    /// The deadline covering the whole retry sequence elapsed.
    #[error("deadline of {deadline:?} elapsed")]
    Timeout {
        /// The deadline that was exceeded.
        deadline: Duration,
    },

    /// An attempt panicked. Panics are not retried and skip the fallback.
    #[error("operation panicked after {attempts} attempt(s): {message}")]
    Panicked {
        /// Number of attempts made, including the one that panicked.
        attempts: usize,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl<E> ResilienceError<E> {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilienceError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ResilienceError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            ResilienceError::Fallback { .. } => ErrorKind::Fallback,
            ResilienceError::Timeout { .. } => ErrorKind::Timeout,
            ResilienceError::Panicked { .. } => ErrorKind::Panicked,
        }
    }

    /// Returns `true` if the call was rejected by an open circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if every attempt failed.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ResilienceError::RetriesExhausted { .. })
    }

    /// Returns `true` if the fallback failed.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ResilienceError::Fallback { .. })
    }

    /// Returns `true` if the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// Returns `true` if an attempt panicked.
    pub fn is_panicked(&self) -> bool {
        matches!(self, ResilienceError::Panicked { .. })
    }

    /// Returns the operation's own error, if this variant carries one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            ResilienceError::RetriesExhausted { last_error, .. } => Some(last_error),
            ResilienceError::Fallback { error } => Some(error),
            _ => None,
        }
    }

    /// Consumes the error, returning the operation's own error if present.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            ResilienceError::RetriesExhausted { last_error, .. } => Some(last_error),
            ResilienceError::Fallback { error } => Some(error),
            _ => None,
        }
    }

    /// Maps the operation error using a function.
    ///
    /// ```
    /// use bulwark_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::RetriesExhausted {
    ///     attempts: 3,
    ///     last_error: "boom".to_string(),
    /// };
    /// let mapped: ResilienceError<usize> = err.map_operation_error(|s| s.len());
    /// assert_eq!(mapped.into_operation_error(), Some(4));
    /// ```
    pub fn map_operation_error<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::RetriesExhausted {
                attempts,
                last_error,
            } => ResilienceError::RetriesExhausted {
                attempts,
                last_error: f(last_error),
            },
            ResilienceError::Fallback { error } => ResilienceError::Fallback { error: f(error) },
            ResilienceError::Timeout { deadline } => ResilienceError::Timeout { deadline },
            ResilienceError::Panicked { attempts, message } => {
                ResilienceError::Panicked { attempts, message }
            }
        }
    }
}
