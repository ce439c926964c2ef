use crate::executor::ResilientExecutor;
use crate::service::ResilientService;
use std::sync::Arc;
use tower_layer::Layer;

/// A Tower layer that runs every request through a [`ResilientExecutor`].
///
/// All requests share one operation name, and so one circuit breaker, retry
/// policy and fallback.
///
/// ```
/// use bulwark_executor::{ResilientExecutor, ResilientLayer};
/// use tower::{service_fn, Layer};
///
/// let executor = ResilientExecutor::builder().name("gateway").build();
/// let layer = ResilientLayer::new(executor, "pricing");
/// let _service = layer.layer(service_fn(|sku: String| async move {
///     Ok::<_, std::io::Error>(sku.len())
/// }));
/// ```
#[derive(Debug, Clone)]
pub struct ResilientLayer {
    executor: ResilientExecutor,
    operation: Arc<str>,
}

impl ResilientLayer {
    /// Creates a layer calling through `executor` under `operation`.
    pub fn new(executor: ResilientExecutor, operation: impl AsRef<str>) -> Self {
        Self {
            executor,
            operation: Arc::from(operation.as_ref()),
        }
    }

    /// The operation name requests run under.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl<S> Layer<S> for ResilientLayer {
    type Service = ResilientService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ResilientService::new(service, self.executor.clone(), Arc::clone(&self.operation))
    }
}
