//! Backoff strategies.
//!
//! Attempts are 1-indexed; a delay is only ever computed for attempt 2 and
//! later (the wait *before* that attempt).

use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BackoffStrategy {
    /// `initial * k` before attempt `k`.
    Linear,
    /// `initial * 2^(k-2)` before attempt `k`: the first retry waits `initial`.
    #[default]
    Exponential,
    /// `initial * fib(k)` with `fib(1) = fib(2) = 1`.
    Fibonacci,
    /// Uniform in `[0, exponential delay]`.
    Random,
}

impl BackoffStrategy {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::Fibonacci => "fibonacci",
            BackoffStrategy::Random => "random",
        }
    }

    /// Deterministic growth of the strategy before the `max` cap.
    ///
    /// For [`BackoffStrategy::Random`] this is the upper bound of the draw.
    pub(crate) fn ceiling(&self, initial: Duration, attempt: u32, max: Duration) -> Duration {
        let scaled = match self {
            BackoffStrategy::Linear => initial.checked_mul(attempt),
            BackoffStrategy::Exponential | BackoffStrategy::Random => {
                let exponent = attempt.saturating_sub(2);
                2u32.checked_pow(exponent).and_then(|factor| initial.checked_mul(factor))
            }
            BackoffStrategy::Fibonacci => u32::try_from(fibonacci(attempt))
                .ok()
                .and_then(|factor| initial.checked_mul(factor)),
        };
        scaled.map_or(max, |delay| delay.min(max))
    }
}

/// `fib(1) = fib(2) = 1`, saturating at `u64::MAX`.
pub(crate) fn fibonacci(n: u32) -> u64 {
    // fib(94) is the first term past u64::MAX.
    if n >= 94 {
        return u64::MAX;
    }
    let (mut prev, mut curr) = (0u64, 1u64);
    for _ in 1..n {
        let next = prev.saturating_add(curr);
        prev = curr;
        curr = next;
    }
    if n == 0 {
        0
    } else {
        curr
    }
}
