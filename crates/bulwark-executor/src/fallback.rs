use bulwark_core::ResilienceError;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type FallbackFn<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Substitute results keyed by operation name.
///
/// A fallback is only consulted once every attempt of an operation has
/// failed. Its own failure is final: fallbacks are not chained.
///
/// Entries are stored type-erased. A fallback registered for one
/// `Result<T, E>` is invisible to a lookup that expects another, and the
/// lookup behaves as if nothing was registered.
///
/// ```
/// use bulwark_executor::FallbackRegistry;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fallbacks = FallbackRegistry::new();
/// fallbacks.register_value::<_, std::io::Error>("recommendations", Vec::<u32>::new());
///
/// let result = fallbacks
///     .execute_with_fallback("recommendations", || async {
///         Err::<Vec<u32>, _>(std::io::Error::other("model offline"))
///     })
///     .await;
/// assert_eq!(result.unwrap(), Vec::<u32>::new());
/// # }
/// ```
#[derive(Clone, Default)]
pub struct FallbackRegistry {
    entries: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl fmt::Debug for FallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        f.debug_struct("FallbackRegistry")
            .field("operations", &names)
            .finish()
    }
}

impl FallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fallback` for `operation`, replacing any previous one.
    pub fn register<T, E, F, Fut>(&self, operation: impl Into<String>, fallback: F)
    where
        T: Send + 'static,
        E: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let erased: FallbackFn<T, E> = Arc::new(move || fallback().boxed());
        self.entries
            .write()
            .insert(operation.into(), Arc::new(erased));
    }

    /// Registers a constant fallback value for `operation`.
    pub fn register_value<T, E>(&self, operation: impl Into<String>, value: T)
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        self.register(operation, move || {
            let value = value.clone();
            async move { Ok::<T, E>(value) }
        });
    }

    /// Removes the fallback for `operation`. Returns true if one was registered.
    pub fn unregister(&self, operation: &str) -> bool {
        self.entries.write().remove(operation).is_some()
    }

    /// Returns true if a fallback of any type is registered for `operation`.
    pub fn contains(&self, operation: &str) -> bool {
        self.entries.read().contains_key(operation)
    }

    /// Number of registered fallbacks.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no fallback is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Runs the fallback registered for `operation`.
    ///
    /// Returns `None` if there is none for this result type.
    pub async fn invoke<T, E>(&self, operation: &str) -> Option<Result<T, E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let fallback = self.lookup::<T, E>(operation)?;
        Some(fallback().await)
    }

    /// Runs `op` once and, if it fails, the fallback registered for `operation`.
    ///
    /// Without a fallback the error is returned as
    /// [`ResilienceError::RetriesExhausted`] after one attempt. A failing
    /// fallback yields [`ResilienceError::Fallback`].
    pub async fn execute_with_fallback<T, E, F, Fut>(
        &self,
        operation: &str,
        op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let last_error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        match self.invoke::<T, E>(operation).await {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(ResilienceError::Fallback { error }),
            None => Err(ResilienceError::RetriesExhausted {
                attempts: 1,
                last_error,
            }),
        }
    }

    fn lookup<T, E>(&self, operation: &str) -> Option<FallbackFn<T, E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let entry = self.entries.read().get(operation).cloned()?;
        let fallback = entry.downcast_ref::<FallbackFn<T, E>>().cloned();
        #[cfg(feature = "tracing")]
        if fallback.is_none() {
            tracing::warn!(
                operation,
                "fallback registered with a different result type, ignoring it"
            );
        }
        fallback
    }
}
