use crate::batch::{Batch, FlushReason};
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::events::BatchEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

struct State<T> {
    buffer: Vec<T>,
    /// Bumped on every release so a stale timer can tell its buffer is gone.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    /// The timer fired with no consumer registered.
    expired: bool,
    closed: bool,
}

impl<T> State<T> {
    fn release(&mut self, reason: FlushReason) -> Batch<T> {
        self.generation = self.generation.wrapping_add(1);
        self.expired = false;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        Batch {
            items: mem::take(&mut self.buffer),
            reason,
        }
    }

    fn pending_reason(&self) -> FlushReason {
        if self.expired {
            FlushReason::Timeout
        } else {
            FlushReason::Manual
        }
    }
}

pub(crate) struct Inner<T> {
    config: BatchConfig<T>,
    state: Mutex<State<T>>,
}

impl<T> Inner<T> {
    fn expire(&self, generation: u64) {
        let batch = {
            let mut state = self.state.lock();
            if state.generation != generation || state.buffer.is_empty() {
                return;
            }
            // this task is the timer
            state.timer = None;
            if self.config.consumer.is_none() {
                state.expired = true;
                return;
            }
            state.release(FlushReason::Timeout)
        };

        self.record_release(&batch);
        if let Some(consumer) = &self.config.consumer {
            consumer(batch);
        }
    }

    fn record_release(&self, batch: &Batch<T>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            batch = %self.config.name,
            size = batch.len(),
            reason = batch.reason.as_str(),
            "batch released"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "batch_flushes_total",
                "batch" => self.config.name.clone(),
                "reason" => batch.reason.as_str()
            )
            .increment(1);
            histogram!("batch_size", "batch" => self.config.name.clone())
                .record(batch.len() as f64);
        }

        self.config.event_listeners.emit(&BatchEvent::BatchReleased {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            size: batch.len(),
            reason: batch.reason,
        });
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
    }
}

/// Groups items into batches released by size, by timeout, or on demand.
///
/// A batch is handed to exactly one recipient: whoever triggered its release.
/// [`add_item`](Self::add_item) returns the batch its item completed,
/// [`flush`](Self::flush) and [`close`](Self::close) return what was pending,
/// and batches released by the timer go to the
/// [`on_batch`](crate::BatchConfigBuilder::on_batch) consumer.
///
/// The timer starts when an item enters an empty buffer and is cancelled by
/// any release. Timers need a Tokio runtime; outside one, batches are only
/// released by size or on demand.
///
/// ```
/// use bulwark_batch::{BatchAggregator, BatchConfig, FlushReason};
///
/// # fn main() -> Result<(), bulwark_batch::BatchError> {
/// let batcher = BatchAggregator::new(BatchConfig::builder().batch_size(2).build()?);
///
/// assert!(batcher.add_item("a")?.is_none());
/// let batch = batcher.add_item("b")?.expect("full batch");
/// assert_eq!(batch.items, vec!["a", "b"]);
/// assert_eq!(batch.reason, FlushReason::Size);
/// # Ok(())
/// # }
/// ```
pub struct BatchAggregator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BatchAggregator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BatchAggregator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BatchAggregator")
            .field("name", &self.inner.config.name)
            .field("pending", &state.buffer.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T: Send + 'static> BatchAggregator<T> {
    /// Creates an aggregator with an empty buffer.
    pub fn new(config: BatchConfig<T>) -> Self {
        let buffer = Vec::with_capacity(config.batch_size.min(1024));
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    buffer,
                    generation: 0,
                    timer: None,
                    expired: false,
                    closed: false,
                }),
            }),
        }
    }

    /// Buffers `item`.
    ///
    /// Returns the batch released by this call, if any: the buffer this item
    /// filled, or a buffer whose timeout already elapsed with no consumer to
    /// take it. In the latter case `item` starts the next buffer.
    pub fn add_item(&self, item: T) -> Result<Option<Batch<T>>, BatchError> {
        let released = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(BatchError::Closed);
            }

            // An expired buffer only exists when batch_size > 1, so `item`
            // cannot fill the next batch on its own.
            let stale = if state.expired {
                Some(state.release(FlushReason::Timeout))
            } else {
                None
            };

            state.buffer.push(item);
            if state.buffer.len() >= self.inner.config.batch_size {
                Some(state.release(FlushReason::Size))
            } else {
                if state.buffer.len() == 1 {
                    self.arm_timer(&mut state);
                }
                stale
            }
        };

        if let Some(batch) = &released {
            self.inner.record_release(batch);
        }
        Ok(released)
    }

    fn arm_timer(&self, state: &mut State<T>) {
        let Ok(runtime) = Handle::try_current() else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                batch = %self.inner.config.name,
                "no tokio runtime, batch timeout disabled"
            );
            return;
        };

        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let generation = state.generation;
        let timeout = self.inner.config.timeout;
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(generation);
            }
        }));
    }
}

impl<T> BatchAggregator<T> {
    /// Releases whatever is buffered.
    ///
    /// The batch is tagged [`FlushReason::Timeout`] if its timeout already
    /// elapsed, [`FlushReason::Manual`] otherwise.
    pub fn flush(&self) -> Option<Batch<T>> {
        let batch = {
            let mut state = self.inner.state.lock();
            if state.buffer.is_empty() {
                return None;
            }
            let reason = state.pending_reason();
            state.release(reason)
        };
        self.inner.record_release(&batch);
        Some(batch)
    }

    /// Rejects further items and releases whatever is buffered.
    pub fn close(&self) -> Option<Batch<T>> {
        let batch = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            if state.buffer.is_empty() {
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                return None;
            }
            let reason = state.pending_reason();
            state.release(reason)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(batch = %self.inner.config.name, "batch aggregator closed");

        self.inner.record_release(&batch);
        Some(batch)
    }

    /// Number of buffered items.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// Returns true once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The configuration this aggregator was built with.
    pub fn config(&self) -> &BatchConfig<T> {
        &self.inner.config
    }
}
