use thiserror::Error;

/// Errors returned by [`BatchAggregator`](crate::BatchAggregator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// The aggregator was closed and accepts no more items.
    #[error("batch aggregator is closed")]
    Closed,

    /// A batch size of zero was configured.
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}
