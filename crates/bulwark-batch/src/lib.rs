//! Batch aggregation for bulwark.
//!
//! A [`BatchAggregator`] buffers items and releases them as a [`Batch`] when
//! the buffer reaches `batch_size`, when `timeout` has elapsed since the
//! first buffered item, or on [`flush`](BatchAggregator::flush) and
//! [`close`](BatchAggregator::close).
//!
//! ```
//! use bulwark_batch::{BatchAggregator, BatchConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bulwark_batch::BatchError> {
//! let config = BatchConfig::builder()
//!     .name("audit-log")
//!     .batch_size(50)
//!     .timeout(Duration::from_millis(200))
//!     .on_batch(|batch| println!("writing {} records", batch.len()))
//!     .build()?;
//! let batcher = BatchAggregator::new(config);
//!
//! if let Some(batch) = batcher.add_item("login")? {
//!     println!("writing {} records", batch.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! - `tracing`: log releases
//! - `metrics`: `batch_flushes_total` by reason and the `batch_size` histogram

mod aggregator;
mod batch;
mod config;
mod error;
mod events;

pub use aggregator::BatchAggregator;
pub use batch::{Batch, FlushReason};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use error::BatchError;
pub use events::BatchEvent;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

pub(crate) fn init_metrics() {
    #[cfg(feature = "metrics")]
    METRICS_INIT.call_once(|| {
        metrics::describe_counter!(
            "batch_flushes_total",
            "Total number of batches released, by reason"
        );
        metrics::describe_histogram!("batch_size", "Number of items per released batch");
    });
}
