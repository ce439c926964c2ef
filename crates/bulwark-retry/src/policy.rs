use crate::backoff::BackoffStrategy;
use rand::Rng;
use std::time::Duration;

/// Immutable retry configuration: how many attempts, and how long to wait
/// between them.
///
/// A policy is plain data. It is built once per class of protected operation
/// and shared freely; computing a delay has no side effects.
///
/// ```
/// use bulwark_retry::{BackoffStrategy, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(5)
///     .initial_delay(Duration::from_secs(1))
///     .max_delay(Duration::from_secs(30))
///     .strategy(BackoffStrategy::Exponential)
///     .build();
///
/// assert_eq!(policy.base_delay(2), Duration::from_secs(1));
/// assert_eq!(policy.base_delay(5), Duration::from_secs(8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
    strategy: BackoffStrategy,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a new policy builder.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay unit the strategies scale.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound on any computed delay (before jitter).
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Backoff strategy.
    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// Whether jitter is added to computed delays.
    pub fn jitter(&self) -> bool {
        self.jitter
    }

    /// Returns true if attempt number `attempt` (1-indexed) is allowed.
    pub fn allows_attempt(&self, attempt: usize) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    /// The deterministic part of the delay before `attempt`, capped at `max_delay`.
    ///
    /// For [`BackoffStrategy::Random`] this is the upper bound of the draw.
    /// Attempt 1 never waits.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let attempt = u32::try_from(attempt).unwrap_or(u32::MAX);
        self.strategy.ceiling(self.initial_delay, attempt, self.max_delay)
    }

    /// Delay to sleep before `attempt`, drawing randomness from the thread RNG.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        self.delay_with_rng(attempt, &mut rand::rng())
    }

    /// Delay to sleep before `attempt`, drawing randomness from `rng`.
    ///
    /// With a seeded RNG the result is a pure function of `(attempt, policy, seed)`.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt: usize, rng: &mut R) -> Duration {
        let ceiling = self.base_delay(attempt);
        let delay = match self.strategy {
            BackoffStrategy::Random => uniform_up_to(ceiling, rng),
            _ => ceiling,
        };
        if self.jitter {
            delay.saturating_add(uniform_up_to(delay.mul_f64(0.1), rng))
        } else {
            delay
        }
    }
}

fn uniform_up_to<R: Rng + ?Sized>(upper: Duration, rng: &mut R) -> Duration {
    let nanos = u64::try_from(upper.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.random_range(0..=nanos))
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicyBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - initial_delay: 100ms
    /// - max_delay: 30s
    /// - strategy: Exponential
    /// - jitter: off
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
        }
    }

    /// Sets the total number of attempts, including the first one.
    ///
    /// Values below 1 are raised to 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.policy.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay unit the strategy scales.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Caps the computed delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Sets the backoff strategy.
    pub fn strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.policy.strategy = strategy;
        self
    }

    /// Shorthand for [`BackoffStrategy::Linear`].
    pub fn linear(self, initial_delay: Duration) -> Self {
        self.strategy(BackoffStrategy::Linear).initial_delay(initial_delay)
    }

    /// Shorthand for [`BackoffStrategy::Exponential`].
    pub fn exponential(self, initial_delay: Duration) -> Self {
        self.strategy(BackoffStrategy::Exponential).initial_delay(initial_delay)
    }

    /// Shorthand for [`BackoffStrategy::Fibonacci`].
    pub fn fibonacci(self, initial_delay: Duration) -> Self {
        self.strategy(BackoffStrategy::Fibonacci).initial_delay(initial_delay)
    }

    /// Shorthand for [`BackoffStrategy::Random`].
    pub fn random(self, initial_delay: Duration) -> Self {
        self.strategy(BackoffStrategy::Random).initial_delay(initial_delay)
    }

    /// Adds uniform noise in `[0, delay * 0.1]` to every computed delay.
    ///
    /// Keeps many callers that failed together from retrying in lockstep.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.policy.jitter = enabled;
        self
    }

    /// Builds the policy.
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}
