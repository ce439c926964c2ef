use crate::batch::{Batch, FlushReason};
use crate::error::BatchError;
use crate::events::BatchEvent;
use bulwark_core::{EventListeners, FnListener, UNNAMED};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub(crate) type BatchConsumer<T> = Arc<dyn Fn(Batch<T>) + Send + Sync>;

/// Configuration for a [`BatchAggregator`](crate::BatchAggregator).
pub struct BatchConfig<T> {
    pub(crate) batch_size: usize,
    pub(crate) timeout: Duration,
    pub(crate) consumer: Option<BatchConsumer<T>>,
    pub(crate) event_listeners: EventListeners<BatchEvent>,
    pub(crate) name: String,
}

impl<T> Clone for BatchConfig<T> {
    fn clone(&self) -> Self {
        Self {
            batch_size: self.batch_size,
            timeout: self.timeout,
            consumer: self.consumer.clone(),
            event_listeners: self.event_listeners.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Debug for BatchConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .field("has_consumer", &self.consumer.is_some())
            .field("name", &self.name)
            .finish()
    }
}

impl<T> BatchConfig<T> {
    /// Creates a new configuration builder.
    pub fn builder() -> BatchConfigBuilder<T> {
        BatchConfigBuilder::new()
    }

    /// Items per full batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Maximum time an item waits in the buffer.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder<T> {
    batch_size: usize,
    timeout: Duration,
    consumer: Option<BatchConsumer<T>>,
    event_listeners: EventListeners<BatchEvent>,
    name: String,
}

impl<T> Default for BatchConfigBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BatchConfigBuilder<T> {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - batch_size: 100
    /// - timeout: 1s
    /// - consumer: none
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        crate::init_metrics();
        Self {
            batch_size: 100,
            timeout: Duration::from_secs(1),
            consumer: None,
            event_listeners: EventListeners::new(),
            name: UNNAMED.to_string(),
        }
    }

    /// Sets how many items make a full batch. Must be at least 1.
    ///
    /// Default: 100
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets how long the first buffered item may wait before the buffer is
    /// released.
    ///
    /// Default: 1 second
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the consumer that receives batches released by the timer.
    ///
    /// Batches released by [`add_item`](crate::BatchAggregator::add_item),
    /// [`flush`](crate::BatchAggregator::flush) or
    /// [`close`](crate::BatchAggregator::close) are returned to their caller
    /// instead. Without a consumer, a timed-out buffer is handed to the next
    /// caller of one of those methods.
    pub fn on_batch<F>(mut self, consumer: F) -> Self
    where
        F: Fn(Batch<T>) + Send + Sync + 'static,
    {
        self.consumer = Some(Arc::new(consumer));
        self
    }

    /// Sets the name used in events, logs and metric labels.
    ///
    /// Default: `"<unnamed>"`
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for every release, with `(size, reason)`.
    pub fn on_release<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, FlushReason) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &BatchEvent| {
                let BatchEvent::BatchReleased { size, reason, .. } = event;
                f(*size, *reason);
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<BatchConfig<T>, BatchError> {
        if self.batch_size == 0 {
            return Err(BatchError::InvalidBatchSize);
        }
        Ok(BatchConfig {
            batch_size: self.batch_size,
            timeout: self.timeout,
            consumer: self.consumer,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
