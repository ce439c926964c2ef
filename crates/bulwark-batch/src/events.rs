use crate::batch::FlushReason;
use bulwark_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a [`BatchAggregator`](crate::BatchAggregator).
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A batch left the buffer.
    BatchReleased {
        pattern_name: String,
        timestamp: Instant,
        size: usize,
        reason: FlushReason,
    },
}

impl ResilienceEvent for BatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BatchEvent::BatchReleased { .. } => "batch_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BatchEvent::BatchReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BatchEvent::BatchReleased { pattern_name, .. } => pattern_name,
        }
    }
}
