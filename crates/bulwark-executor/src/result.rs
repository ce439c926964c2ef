use bulwark_core::ResilienceError;
use std::time::Duration;

/// Outcome of one [`ResilientExecutor`](crate::ResilientExecutor) call.
#[derive(Debug)]
pub struct ExecutionResult<T, E> {
    /// The value, or why there is none.
    pub outcome: Result<T, ResilienceError<E>>,
    /// Attempts made on the primary operation. Zero when the call was
    /// rejected by an open circuit or answered from a cache.
    pub attempts: usize,
    /// True when a fallback produced the outcome, successful or not.
    pub used_fallback: bool,
    /// True when the value came from a cache and nothing was attempted.
    pub from_cache: bool,
    /// Wall time spent in the executor.
    pub elapsed: Duration,
}

impl<T, E> ExecutionResult<T, E> {
    /// Returns true if a value was produced, by the operation or its fallback.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The produced value, if any.
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The final error, if any.
    pub fn error(&self) -> Option<&ResilienceError<E>> {
        self.outcome.as_ref().err()
    }

    /// Consumes the result, keeping only the outcome.
    pub fn into_result(self) -> Result<T, ResilienceError<E>> {
        self.outcome
    }

    /// Consumes the result, returning the value if there is one.
    pub fn into_value(self) -> Option<T> {
        self.outcome.ok()
    }
}
