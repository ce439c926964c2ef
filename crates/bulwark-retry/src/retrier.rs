use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use bulwark_core::{EventListeners, FnListener, UNNAMED};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Decides whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Runs an operation under a [`RetryPolicy`], sleeping between attempts.
///
/// The retrier is the standalone form of the retry loop. It does not consult a
/// circuit breaker or a fallback; use the executor crate for the composed
/// behaviour.
///
/// ```
/// use bulwark_retry::{Retrier, RetryPolicy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let retrier: Retrier<String> = Retrier::builder()
///     .policy(RetryPolicy::builder().max_attempts(3).linear(Duration::from_millis(1)).build())
///     .retry_on(|e: &String| e != "fatal")
///     .name("inventory")
///     .build();
///
/// let mut calls = 0;
/// let result = retrier
///     .run(|| {
///         calls += 1;
///         let n = calls;
///         async move { if n < 2 { Err("busy".to_string()) } else { Ok(n) } }
///     })
///     .await;
/// assert_eq!(result, Ok(2));
/// # }
/// ```
pub struct Retrier<E> {
    policy: RetryPolicy,
    predicate: Option<RetryPredicate<E>>,
    listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Clone for Retrier<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            predicate: self.predicate.clone(),
            listeners: self.listeners.clone(),
            name: self.name.clone(),
        }
    }
}

impl<E> fmt::Debug for Retrier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

impl<E> Retrier<E> {
    /// Creates a new builder.
    pub fn builder() -> RetrierBuilder<E> {
        RetrierBuilder::new()
    }

    /// Creates an unnamed retrier that retries every error.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::builder().policy(policy).build()
    }

    /// The policy driving this retrier.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Instance name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `error` should be retried. Without a predicate every
    /// error is retried.
    pub fn should_retry(&self, error: &E) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(error))
    }

    /// Runs `operation` until it succeeds, the predicate rejects its error, or
    /// the policy's attempts are used up. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "success")
                        .increment(1);
                    self.listeners.emit(&RetryEvent::Success {
                        pattern_name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(&error) {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(retry = %self.name, attempt, "error not retryable");
                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "ignored")
                            .increment(1);
                        self.listeners.emit(&RetryEvent::IgnoredError {
                            pattern_name: self.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(error);
                    }

                    if !self.policy.allows_attempt(attempt + 1) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(retry = %self.name, attempts = attempt, "retries exhausted");
                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => self.name.clone(), "outcome" => "exhausted")
                            .increment(1);
                        self.listeners.emit(&RetryEvent::Error {
                            pattern_name: self.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Err(error);
                    }

                    attempt += 1;
                    let delay = self.policy.delay_for_attempt(attempt);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retry = %self.name, attempt, ?delay, "retrying");
                    #[cfg(feature = "metrics")]
                    counter!("retry_attempts_total", "retry" => self.name.clone()).increment(1);
                    self.listeners.emit(&RetryEvent::Retry {
                        pattern_name: self.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Builder for [`Retrier`].
pub struct RetrierBuilder<E> {
    policy: RetryPolicy,
    predicate: Option<RetryPredicate<E>>,
    listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetrierBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetrierBuilder<E> {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - policy: [`RetryPolicy::default`]
    /// - predicate: none (every error is retried)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            policy: RetryPolicy::default(),
            predicate: None,
            listeners: EventListeners::new(),
            name: UNNAMED.to_string(),
        }
    }

    /// Sets the retry policy.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Only errors for which `predicate` returns true are retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the instance name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Called before each retry with the upcoming attempt number and its delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Called on success with the number of attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Called when every attempt failed.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Called when the predicate rejected an error.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::IgnoredError { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retrier.
    pub fn build(self) -> Retrier<E> {
        Retrier {
            policy: self.policy,
            predicate: self.predicate,
            listeners: self.listeners,
            name: self.name,
        }
    }
}
