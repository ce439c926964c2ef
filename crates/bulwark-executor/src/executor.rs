use crate::events::ExecutorEvent;
use crate::fallback::FallbackRegistry;
use crate::result::ExecutionResult;
use bulwark_cache::SmartCache;
use bulwark_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use bulwark_core::{EventListeners, FnListener, ResilienceError, UNNAMED};
use bulwark_retry::RetryPolicy;
use futures::FutureExt;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

struct Inner {
    name: String,
    default_policy: RetryPolicy,
    default_breaker: CircuitBreakerConfig,
    policies: RwLock<HashMap<String, RetryPolicy>>,
    breaker_configs: RwLock<HashMap<String, CircuitBreakerConfig>>,
    breakers: RwLock<HashMap<String, CircuitBreaker>>,
    fallbacks: FallbackRegistry,
    listeners: EventListeners<ExecutorEvent>,
}

/// Runs named operations under retry, circuit breaking and fallbacks.
///
/// Each operation name gets its own [`CircuitBreaker`], created on first use
/// from the default breaker configuration or a per-operation override. A
/// call proceeds as follows:
///
/// 1. If the operation's circuit rejects the call, the result is
///    [`ResilienceError::CircuitOpen`] and nothing is attempted.
/// 2. Each attempt's outcome is reported to the breaker. A failure that
///    opens the circuit ends the call with `CircuitOpen`; the fallback is
///    not consulted.
/// 3. Between attempts the executor sleeps for the policy's delay without
///    holding any lock.
/// 4. Once attempts are used up, the registered fallback runs. Its error
///    becomes [`ResilienceError::Fallback`]. Without a fallback the result is
///    [`ResilienceError::RetriesExhausted`] carrying the last error.
///
/// An attempt that panics counts as a failure for the breaker and ends the
/// call with [`ResilienceError::Panicked`]. It is not retried and the
/// fallback is not consulted.
///
/// The executor is a cheap handle; clones share breakers and fallbacks.
///
/// ```
/// use bulwark_executor::ResilientExecutor;
/// use bulwark_retry::RetryPolicy;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = ResilientExecutor::builder()
///     .retry_policy(RetryPolicy::builder().max_attempts(3).exponential(Duration::from_millis(1)).build())
///     .build();
///
/// let mut calls = 0;
/// let result = executor
///     .execute("inventory", || {
///         calls += 1;
///         let n = calls;
///         async move { if n < 3 { Err("busy") } else { Ok(n) } }
///     })
///     .await;
/// assert_eq!(result.attempts, 3);
/// assert_eq!(result.into_result().ok(), Some(3));
/// # }
/// ```
#[derive(Clone)]
pub struct ResilientExecutor {
    inner: Arc<Inner>,
}

impl fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("name", &self.inner.name)
            .field("default_policy", &self.inner.default_policy)
            .field("breakers", &self.breaker_states())
            .finish()
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ResilientExecutor {
    /// Creates a new builder.
    pub fn builder() -> ResilientExecutorBuilder {
        ResilientExecutorBuilder::new()
    }

    /// Executor name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The fallback registry consulted on exhausted retries.
    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.inner.fallbacks
    }

    /// Overrides the retry policy for one operation.
    pub fn retry_policy_for(&self, operation: impl Into<String>, policy: RetryPolicy) {
        self.inner.policies.write().insert(operation.into(), policy);
    }

    /// The retry policy `operation` runs under.
    pub fn policy_for(&self, operation: &str) -> RetryPolicy {
        self.inner
            .policies
            .read()
            .get(operation)
            .copied()
            .unwrap_or(self.inner.default_policy)
    }

    /// Overrides the breaker configuration for one operation.
    ///
    /// An existing breaker for `operation` is replaced by a fresh, closed one.
    pub fn breaker_config_for(&self, operation: impl Into<String>, config: CircuitBreakerConfig) {
        let operation = operation.into();
        let breaker = CircuitBreaker::new(config.renamed(operation.clone()));
        self.inner
            .breaker_configs
            .write()
            .insert(operation.clone(), config);
        let mut breakers = self.inner.breakers.write();
        if breakers.contains_key(&operation) {
            breakers.insert(operation, breaker);
        }
    }

    /// The breaker guarding `operation`, created on first use.
    pub fn breaker(&self, operation: &str) -> CircuitBreaker {
        if let Some(breaker) = self.inner.breakers.read().get(operation) {
            return breaker.clone();
        }

        let config = self
            .inner
            .breaker_configs
            .read()
            .get(operation)
            .unwrap_or(&self.inner.default_breaker)
            .renamed(operation);
        self.inner
            .breakers
            .write()
            .entry(operation.to_string())
            .or_insert_with(|| CircuitBreaker::new(config))
            .clone()
    }

    /// Closes the breaker of `operation`. Returns false if it was never used.
    pub fn reset_breaker(&self, operation: &str) -> bool {
        let breaker = self.inner.breakers.read().get(operation).cloned();
        match breaker {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Current state of every breaker created so far, by operation name.
    pub fn breaker_states(&self) -> BTreeMap<String, CircuitState> {
        self.inner
            .breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state_sync()))
            .collect()
    }

    /// Runs `op` under the operation's breaker, retry policy and fallback.
    ///
    /// Every error is retried.
    pub async fn execute<T, E, F, Fut>(&self, operation: &str, op: F) -> ExecutionResult<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_predicate(operation, |_: &E| true, op).await
    }

    /// Like [`execute`](Self::execute), but only errors for which
    /// `should_retry` returns true are retried.
    ///
    /// A rejected error is still reported to the breaker, then goes straight
    /// to the fallback path.
    pub async fn execute_with_predicate<T, E, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        op: F,
    ) -> ExecutionResult<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let attempts = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let (outcome, used_fallback) = self.run(operation, op, should_retry, &attempts).await;
        self.finish(operation, outcome, used_fallback, &attempts, started)
    }

    /// Like [`execute`](Self::execute), bounded by `deadline` across every
    /// attempt and delay.
    ///
    /// When the deadline elapses the attempt in flight is dropped and the
    /// result is [`ResilienceError::Timeout`]. The fallback is not consulted.
    pub async fn execute_with_timeout<T, E, F, Fut>(
        &self,
        operation: &str,
        op: F,
        deadline: Duration,
    ) -> ExecutionResult<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let run = self.run(operation, op, |_: &E| true, &attempts);
        match tokio::time::timeout(deadline, run).await {
            Ok((outcome, used_fallback)) => {
                self.finish(operation, outcome, used_fallback, &attempts, started)
            }
            Err(_) => {
                let made = attempts.load(Ordering::Acquire);
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    executor = %self.inner.name,
                    operation,
                    ?deadline,
                    attempts = made,
                    "deadline elapsed"
                );
                self.emit(ExecutorEvent::TimedOut {
                    pattern_name: self.inner.name.clone(),
                    timestamp: Instant::now(),
                    operation: operation.to_string(),
                    deadline,
                    attempts: made,
                });
                self.finish(
                    operation,
                    Err(ResilienceError::Timeout { deadline }),
                    false,
                    &attempts,
                    started,
                )
            }
        }
    }

    /// Answers from `cache` when it holds `key`; otherwise executes `op` and
    /// caches its value.
    ///
    /// Fallback values are returned but never cached.
    pub async fn execute_cached<K, T, E, F, Fut>(
        &self,
        operation: &str,
        key: K,
        cache: &SmartCache<K, T>,
        op: F,
    ) -> ExecutionResult<T, E>
    where
        K: Hash + Eq + Clone,
        T: Clone + Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = tokio::time::Instant::now();
        if let Some(value) = cache.get(&key) {
            #[cfg(feature = "metrics")]
            counter!(
                "executor_calls_total",
                "executor" => self.inner.name.clone(),
                "operation" => operation.to_string(),
                "outcome" => "cached"
            )
            .increment(1);
            return ExecutionResult {
                outcome: Ok(value),
                attempts: 0,
                used_fallback: false,
                from_cache: true,
                elapsed: started.elapsed(),
            };
        }

        let result = self.execute(operation, op).await;
        if let (Ok(value), false) = (&result.outcome, result.used_fallback) {
            cache.set(key, value.clone());
        }
        result
    }

    async fn run<T, E, F, Fut, P>(
        &self,
        operation: &str,
        mut op: F,
        should_retry: P,
        attempts: &AtomicUsize,
    ) -> (Result<T, ResilienceError<E>>, bool)
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let policy = self.policy_for(operation);
        let breaker = self.breaker(operation);
        let mut attempt = 0;

        let last_error = loop {
            let Ok(permit) = breaker.try_acquire() else {
                #[cfg(feature = "tracing")]
                tracing::debug!(executor = %self.inner.name, operation, attempt, "circuit open");
                self.emit(ExecutorEvent::Rejected {
                    pattern_name: self.inner.name.clone(),
                    timestamp: Instant::now(),
                    operation: operation.to_string(),
                });
                return (Err(circuit_open(operation)), false);
            };

            attempt += 1;
            attempts.store(attempt, Ordering::Release);

            let error = match AssertUnwindSafe(op()).catch_unwind().await {
                Ok(Ok(value)) => {
                    permit.success();
                    return (Ok(value), false);
                }
                Ok(Err(error)) => error,
                Err(payload) => {
                    permit.failure();
                    let message = panic_message(payload.as_ref());
                    #[cfg(feature = "tracing")]
                    tracing::error!(executor = %self.inner.name, operation, attempt, %message, "operation panicked");
                    self.emit(ExecutorEvent::Panicked {
                        pattern_name: self.inner.name.clone(),
                        timestamp: Instant::now(),
                        operation: operation.to_string(),
                        attempt,
                        message: message.clone(),
                    });
                    return (
                        Err(ResilienceError::Panicked {
                            attempts: attempt,
                            message,
                        }),
                        false,
                    );
                }
            };

            if permit.failure() {
                #[cfg(feature = "tracing")]
                tracing::warn!(executor = %self.inner.name, operation, attempt, "failure opened the circuit");
                return (Err(circuit_open(operation)), false);
            }

            if !should_retry(&error) || !policy.allows_attempt(attempt + 1) {
                break error;
            }

            let delay = policy.delay_for_attempt(attempt + 1);
            #[cfg(feature = "tracing")]
            tracing::debug!(executor = %self.inner.name, operation, attempt, ?delay, "retrying");
            self.emit(ExecutorEvent::Retry {
                pattern_name: self.inner.name.clone(),
                timestamp: Instant::now(),
                operation: operation.to_string(),
                attempt: attempt + 1,
                delay,
            });
            tokio::time::sleep(delay).await;
        };

        match self.inner.fallbacks.invoke::<T, E>(operation).await {
            Some(result) => {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    executor = %self.inner.name,
                    operation,
                    attempts = attempt,
                    succeeded = result.is_ok(),
                    "fallback applied"
                );
                self.emit(ExecutorEvent::FallbackApplied {
                    pattern_name: self.inner.name.clone(),
                    timestamp: Instant::now(),
                    operation: operation.to_string(),
                    succeeded: result.is_ok(),
                });
                (result.map_err(|error| ResilienceError::Fallback { error }), true)
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(executor = %self.inner.name, operation, attempts = attempt, "retries exhausted");
                self.emit(ExecutorEvent::RetriesExhausted {
                    pattern_name: self.inner.name.clone(),
                    timestamp: Instant::now(),
                    operation: operation.to_string(),
                    attempts: attempt,
                });
                (
                    Err(ResilienceError::RetriesExhausted {
                        attempts: attempt,
                        last_error,
                    }),
                    false,
                )
            }
        }
    }

    fn finish<T, E>(
        &self,
        operation: &str,
        outcome: Result<T, ResilienceError<E>>,
        used_fallback: bool,
        attempts: &AtomicUsize,
        started: tokio::time::Instant,
    ) -> ExecutionResult<T, E> {
        let elapsed = started.elapsed();

        #[cfg(feature = "metrics")]
        {
            let label = match &outcome {
                Ok(_) if used_fallback => "fallback",
                Ok(_) => "success",
                Err(error) => error.kind().as_str(),
            };
            counter!(
                "executor_calls_total",
                "executor" => self.inner.name.clone(),
                "operation" => operation.to_string(),
                "outcome" => label
            )
            .increment(1);
            histogram!(
                "executor_call_duration_seconds",
                "executor" => self.inner.name.clone(),
                "operation" => operation.to_string()
            )
            .record(elapsed.as_secs_f64());
        }
        #[cfg(not(feature = "metrics"))]
        let _ = operation;

        ExecutionResult {
            outcome,
            attempts: attempts.load(Ordering::Acquire),
            used_fallback,
            from_cache: false,
            elapsed,
        }
    }

    fn emit(&self, event: ExecutorEvent) {
        self.inner.listeners.emit(&event);
    }
}

fn circuit_open<E>(operation: &str) -> ResilienceError<E> {
    ResilienceError::CircuitOpen {
        name: operation.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builder for [`ResilientExecutor`].
pub struct ResilientExecutorBuilder {
    name: String,
    retry_policy: RetryPolicy,
    breaker_config: CircuitBreakerConfig,
    fallbacks: FallbackRegistry,
    listeners: EventListeners<ExecutorEvent>,
}

impl Default for ResilientExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientExecutorBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - retry_policy: [`RetryPolicy::default`] (3 attempts, exponential from 100ms)
    /// - breaker_config: [`CircuitBreakerConfig::default`]
    /// - fallbacks: empty
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            name: UNNAMED.to_string(),
            retry_policy: RetryPolicy::default(),
            breaker_config: CircuitBreakerConfig::default(),
            fallbacks: FallbackRegistry::new(),
            listeners: EventListeners::new(),
        }
    }

    /// Sets the executor name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the retry policy used by operations without an override.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the breaker configuration used by operations without an override.
    ///
    /// Each operation's breaker is named after the operation.
    pub fn breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_config = config;
        self
    }

    /// Uses `fallbacks` instead of an empty registry, so it can be shared.
    pub fn fallbacks(mut self, fallbacks: FallbackRegistry) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Called before each retry with the operation, upcoming attempt and delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize, Duration) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::Retry {
                    operation,
                    attempt,
                    delay,
                    ..
                } = event
                {
                    f(operation, *attempt, *delay);
                }
            }));
        self
    }

    /// Called when a call is rejected by an open circuit.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::Rejected { operation, .. } = event {
                    f(operation);
                }
            }));
        self
    }

    /// Called when every attempt failed and no fallback was registered.
    pub fn on_retries_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::RetriesExhausted {
                    operation,
                    attempts,
                    ..
                } = event
                {
                    f(operation, *attempts);
                }
            }));
        self
    }

    /// Called after a fallback ran, with whether it succeeded.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::FallbackApplied {
                    operation,
                    succeeded,
                    ..
                } = event
                {
                    f(operation, *succeeded);
                }
            }));
        self
    }

    /// Called when a deadline set with
    /// [`execute_with_timeout`](ResilientExecutor::execute_with_timeout) elapses.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::TimedOut {
                    operation,
                    deadline,
                    ..
                } = event
                {
                    f(operation, *deadline);
                }
            }));
        self
    }

    /// Called when an attempt panics, with the panic message.
    pub fn on_panic<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::Panicked {
                    operation, message, ..
                } = event
                {
                    f(operation, message);
                }
            }));
        self
    }

    /// Builds the executor.
    pub fn build(self) -> ResilientExecutor {
        ResilientExecutor {
            inner: Arc::new(Inner {
                name: self.name,
                default_policy: self.retry_policy,
                default_breaker: self.breaker_config,
                policies: RwLock::new(HashMap::new()),
                breaker_configs: RwLock::new(HashMap::new()),
                breakers: RwLock::new(HashMap::new()),
                fallbacks: self.fallbacks,
                listeners: self.listeners,
            }),
        }
    }
}
