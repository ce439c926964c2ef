use crate::executor::ResilientExecutor;
use bulwark_core::ResilienceError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_service::Service;

/// A service wrapped by [`ResilientLayer`](crate::ResilientLayer).
///
/// Each attempt drives its own clone of the inner service to readiness and
/// calls it with a clone of the request. Readiness errors count as failed
/// attempts, so this service itself is always ready.
#[derive(Debug, Clone)]
pub struct ResilientService<S> {
    inner: S,
    executor: ResilientExecutor,
    operation: Arc<str>,
}

impl<S> ResilientService<S> {
    pub(crate) fn new(inner: S, executor: ResilientExecutor, operation: Arc<str>) -> Self {
        Self {
            inner,
            executor,
            operation,
        }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Req> Service<Req> for ResilientService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = ResilienceError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let service = self.inner.clone();
        let executor = self.executor.clone();
        let operation = Arc::clone(&self.operation);

        Box::pin(async move {
            executor
                .execute(&operation, move || {
                    let service = service.clone();
                    let req = req.clone();
                    async move { service.oneshot(req).await }
                })
                .await
                .into_result()
        })
    }
}
