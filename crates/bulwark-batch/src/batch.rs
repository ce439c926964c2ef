/// Why a batch was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// The buffer reached the configured batch size.
    Size,
    /// The timeout elapsed since the first buffered item.
    Timeout,
    /// [`flush`](crate::BatchAggregator::flush) or
    /// [`close`](crate::BatchAggregator::close) was called.
    Manual,
}

impl FlushReason {
    /// Short label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Size => "size",
            FlushReason::Timeout => "timeout",
            FlushReason::Manual => "manual",
        }
    }
}

/// Items released together, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// The buffered items.
    pub items: Vec<T>,
    /// What triggered the release.
    pub reason: FlushReason,
}

impl<T> Batch<T> {
    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the batch, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
