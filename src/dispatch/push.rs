//! Push queue strategy.
//!
//! Events are appended to a bounded buffer; consumers pull them one at a
//! time through a [`PushConsumer`] and answer via the `Submitter`. When the
//! buffer is full the oldest event is evicted and its caller is answered
//! with 503 right away.

use std::sync::Arc;

use crate::config::DispatchMode;
use crate::correlation::{CancelReason, CorrelationTable, RequestId};
use crate::dispatch::buffer::EventBuffer;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::event::Event;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

#[derive(Debug)]
pub struct PushDispatcher {
    buffer: Arc<EventBuffer>,
    table: CorrelationTable,
}

impl PushDispatcher {
    pub fn new(capacity: usize, table: CorrelationTable, stop: ShutdownSignal) -> Self {
        Self {
            buffer: Arc::new(EventBuffer::new(Some(capacity), stop, "push")),
            table,
        }
    }

    pub fn consumer(&self) -> PushConsumer {
        PushConsumer {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl Dispatcher for PushDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Push
    }

    fn hand_off(&self, event: Arc<Event>) -> Result<(), DispatchError> {
        if self.buffer.is_stopped() {
            return Err(DispatchError::Stopped);
        }

        if let Some(evicted) = self.buffer.push(event) {
            tracing::warn!(request_id = %evicted.request_id, "Push queue full, evicted oldest event");
            metrics::record_event_evicted();
            self.table.cancel(&evicted.request_id, CancelReason::Shed);
        }
        Ok(())
    }

    fn queued(&self) -> usize {
        self.buffer.len()
    }

    fn withdraw(&self, id: &RequestId) -> bool {
        self.buffer.remove(id)
    }

    fn shutdown(&self) -> usize {
        self.buffer.clear()
    }
}

/// Receiving side of the push queue. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct PushConsumer {
    buffer: Arc<EventBuffer>,
}

impl PushConsumer {
    /// Wait for the next event. Returns `None` once the bridge stops.
    pub async fn recv(&self) -> Option<Arc<Event>> {
        loop {
            match self.buffer.wait_batch(1, None).await {
                Ok(mut batch) => {
                    if let Some(event) = batch.pop() {
                        return Some(event);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    /// Take the next event if one is buffered.
    pub fn try_recv(&self) -> Option<Arc<Event>> {
        if self.buffer.is_stopped() {
            return None;
        }
        self.buffer.take(1).pop()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
