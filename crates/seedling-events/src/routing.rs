//! Cross-thread delivery of engine events into a single consumer.

use crate::error::{EventBusError, EventBusResult};
use crate::payloads::{EventEnvelope, EventId, SessionEvent};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Stream wrapper handed to the consumer created by [`channel`].
pub type EventStream = UnboundedReceiverStream<EventEnvelope>;

/// Destination for published envelopes.
///
/// Implementations must never block the publishing thread.
pub trait EventSink: Send + Sync {
    /// Hand an envelope to the consumer, returning it when the consumer is gone.
    ///
    /// # Errors
    ///
    /// Returns the envelope when it could not be delivered.
    fn deliver(&self, envelope: EventEnvelope) -> Result<(), EventEnvelope>;

    /// Whether the consumer has stopped receiving.
    fn is_closed(&self) -> bool;
}

impl EventSink for mpsc::UnboundedSender<EventEnvelope> {
    fn deliver(&self, envelope: EventEnvelope) -> Result<(), EventEnvelope> {
        self.send(envelope).map_err(|err| err.0)
    }

    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

/// Publisher shared by engine workers; assigns sequential ids and timestamps.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
    next_id: Arc<AtomicU64>,
}

impl EventPublisher {
    /// Wrap a sink.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish a new event to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SendFailed`] when the consumer has gone away.
    pub fn publish(&self, event: SessionEvent) -> EventBusResult<EventId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event_kind = event.kind();
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        self.sink
            .deliver(envelope)
            .map(|()| id)
            .map_err(|_| EventBusError::SendFailed {
                event_id: id,
                event_kind,
            })
    }

    /// Whether the consumer has stopped receiving.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}

/// Construct a publisher connected to a fresh unbounded stream.
#[must_use]
pub fn channel() -> (EventPublisher, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventPublisher::new(Arc::new(tx)),
        UnboundedReceiverStream::new(rx),
    )
}
