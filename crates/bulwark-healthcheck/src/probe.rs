//! Health probe trait.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Something that can report whether a dependency is healthy.
///
/// A probe returns `Ok(())` when healthy and an error message otherwise. The
/// registry runs every probe on its own task under a timeout, so a probe may
/// block, hang or panic without affecting the others.
///
/// Closures returning a future of `Result<(), E>` with `E: Display` are
/// probes:
///
/// ```
/// use bulwark_healthcheck::HealthProbe;
///
/// let probe = || async { Ok::<(), std::io::Error>(()) };
/// # let _: &dyn HealthProbe = &probe;
/// ```
///
/// Implementing the trait directly:
///
/// ```
/// use bulwark_healthcheck::HealthProbe;
/// use futures::future::BoxFuture;
///
/// struct DiskSpace {
///     min_free_bytes: u64,
/// }
///
/// impl HealthProbe for DiskSpace {
///     fn check(&self) -> BoxFuture<'static, Result<(), String>> {
///         let min = self.min_free_bytes;
///         Box::pin(async move {
///             let free = 10 * 1024 * 1024 * 1024u64;
///             if free >= min {
///                 Ok(())
///             } else {
///                 Err(format!("only {free} bytes free"))
///             }
///         })
///     }
/// }
/// ```
pub trait HealthProbe: Send + Sync {
    /// Runs the probe once.
    fn check(&self) -> BoxFuture<'static, Result<(), String>>;
}

impl<F, Fut, E> HealthProbe for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display,
{
    fn check(&self) -> BoxFuture<'static, Result<(), String>> {
        let fut = self();
        Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
    }
}
