//! Pending-slot table.
//!
//! # Responsibilities
//! - Own one single-shot slot per handed-off request
//! - Deliver a response (or a cancellation) into exactly one slot, once
//! - Remove slots the moment they are resolved, expired or cancelled
//!
//! # Design Decisions
//! - `DashMap::remove` is the linearization point: whoever removes the slot
//!   owns its sender, so the first writer wins and later writers see
//!   `Unknown`
//! - The waiting side holds a [`PendingResponse`] that expires its own slot
//!   when dropped, so timeouts, errors and client disconnects never leave
//!   stale entries
//! - Once closed (shutdown), new registrations are refused

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::correlation::RequestId;
use crate::event::Response;
use crate::observability::metrics;

/// Why a slot was resolved without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The bridge is shutting down.
    ServerStopping,
    /// The event was evicted from a full push queue.
    Shed,
}

/// What a waiter eventually receives.
#[derive(Debug)]
pub enum SlotOutcome {
    Delivered(Response),
    Cancelled(CancelReason),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("request id {0} is already pending")]
    Duplicate(RequestId),

    #[error("no pending request with id {0}")]
    Unknown(RequestId),

    #[error("correlation table is closed")]
    Closed,
}

/// Outcome of waiting on a [`PendingResponse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("no response within {0:?}")]
    TimedOut(Duration),

    #[error("request cancelled: {0:?}")]
    Cancelled(CancelReason),
}

#[derive(Debug)]
struct PendingSlot {
    tx: oneshot::Sender<SlotOutcome>,
    created_at: Instant,
}

/// Maps request ids to their pending slots.
#[derive(Debug, Clone, Default)]
pub struct CorrelationTable {
    slots: Arc<DashMap<RequestId, PendingSlot>>,
    closed: Arc<AtomicBool>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot for `id` and return the end its requester waits on.
    pub fn register(&self, id: RequestId) -> Result<PendingResponse, CorrelationError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CorrelationError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        match self.slots.entry(id.clone()) {
            Entry::Occupied(_) => return Err(CorrelationError::Duplicate(id)),
            Entry::Vacant(vacant) => {
                vacant.insert(PendingSlot {
                    tx,
                    created_at: Instant::now(),
                });
            }
        }
        metrics::record_pending_slots(1);

        // A drain that started after the check above may have missed this slot.
        if self.closed.load(Ordering::SeqCst) {
            self.expire(&id);
            return Err(CorrelationError::Closed);
        }

        Ok(PendingResponse {
            id,
            rx,
            table: self.clone(),
        })
    }

    /// Deliver a response into its slot. Returns how long the slot was pending.
    pub fn resolve(&self, response: Response) -> Result<Duration, CorrelationError> {
        let (id, slot) = self
            .slots
            .remove(&response.request_id)
            .ok_or_else(|| CorrelationError::Unknown(response.request_id.clone()))?;
        metrics::record_pending_slots(-1);

        let age = slot.created_at.elapsed();
        slot.tx
            .send(SlotOutcome::Delivered(response))
            // The waiter went away between removal and delivery.
            .map_err(|_| CorrelationError::Unknown(id))?;
        Ok(age)
    }

    /// Drop a slot without delivering anything. Returns false if it was
    /// already gone.
    pub fn expire(&self, id: &RequestId) -> bool {
        let removed = self.slots.remove(id).is_some();
        if removed {
            metrics::record_pending_slots(-1);
        }
        removed
    }

    /// Resolve a single slot with a cancellation.
    pub fn cancel(&self, id: &RequestId, reason: CancelReason) -> bool {
        match self.slots.remove(id) {
            Some((_, slot)) => {
                metrics::record_pending_slots(-1);
                let _ = slot.tx.send(SlotOutcome::Cancelled(reason));
                true
            }
            None => false,
        }
    }

    /// Close the table and cancel every pending slot. Returns how many
    /// waiters were woken.
    pub fn drain_all(&self, reason: CancelReason) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<RequestId> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        ids.iter().filter(|id| self.cancel(id, reason)).count()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Receiving end of a pending slot.
///
/// Dropping it expires the slot, so a late response is rejected as unknown.
#[derive(Debug)]
pub struct PendingResponse {
    id: RequestId,
    rx: oneshot::Receiver<SlotOutcome>,
    table: CorrelationTable,
}

impl PendingResponse {
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }

    /// Wait for the slot to resolve, giving up after `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<Response, WaitError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome_to_result(outcome),
            // Sender dropped unsent: the table itself went away.
            Ok(Err(_)) => Err(WaitError::Cancelled(CancelReason::ServerStopping)),
            Err(_) => {
                if self.table.expire(&self.id) {
                    return Err(WaitError::TimedOut(timeout));
                }
                // Someone removed the slot right at the deadline; take what they sent.
                match self.rx.try_recv() {
                    Ok(outcome) => outcome_to_result(outcome),
                    Err(_) => Err(WaitError::TimedOut(timeout)),
                }
            }
        }
    }
}

fn outcome_to_result(outcome: SlotOutcome) -> Result<Response, WaitError> {
    match outcome {
        SlotOutcome::Delivered(response) => Ok(response),
        SlotOutcome::Cancelled(reason) => Err(WaitError::Cancelled(reason)),
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if self.table.expire(&self.id) {
            tracing::trace!(request_id = %self.id, "Pending slot expired on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &RequestId, status: u16) -> Response {
        Response::new(id.clone(), status)
    }

    #[tokio::test]
    async fn resolve_delivers_to_waiter() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();
        assert_eq!(table.len(), 1);

        table.resolve(response(&id, 201)).unwrap();
        assert!(table.is_empty());

        let delivered = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(delivered.status, 201);
    }

    #[tokio::test]
    async fn second_resolve_is_unknown() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();

        assert!(table.resolve(response(&id, 200)).is_ok());
        assert_eq!(
            table.resolve(response(&id, 500)),
            Err(CorrelationError::Unknown(id.clone()))
        );

        let delivered = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(delivered.status, 200);
    }

    #[test]
    fn never_issued_id_is_unknown() {
        let table = CorrelationTable::new();
        let id = RequestId::from("nope");
        assert_eq!(
            table.resolve(response(&id, 200)),
            Err(CorrelationError::Unknown(id))
        );
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let _pending = table.register(id.clone()).unwrap();
        assert_eq!(
            table.register(id.clone()).unwrap_err(),
            CorrelationError::Duplicate(id)
        );
    }

    #[tokio::test]
    async fn timeout_expires_slot_and_late_resolve_is_harmless() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();

        let err = pending.wait(Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err, WaitError::TimedOut(Duration::from_millis(20)));
        assert!(!table.is_pending(&id));
        assert_eq!(
            table.resolve(response(&id, 200)),
            Err(CorrelationError::Unknown(id))
        );
    }

    #[test]
    fn dropping_waiter_expires_slot() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();
        drop(pending);
        assert!(table.is_empty());
        assert!(!table.expire(&id));
    }

    #[tokio::test]
    async fn drain_all_cancels_every_waiter_and_closes() {
        let table = CorrelationTable::new();
        let waiters: Vec<_> = (0..5)
            .map(|_| table.register(RequestId::generate()).unwrap())
            .collect();

        assert_eq!(table.drain_all(CancelReason::ServerStopping), 5);
        assert!(table.is_empty());

        for waiter in waiters {
            assert_eq!(
                waiter.wait(Duration::from_secs(1)).await.unwrap_err(),
                WaitError::Cancelled(CancelReason::ServerStopping)
            );
        }

        assert_eq!(
            table.register(RequestId::generate()).unwrap_err(),
            CorrelationError::Closed
        );
    }

    #[tokio::test]
    async fn cancel_single_slot() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();

        assert!(table.cancel(&id, CancelReason::Shed));
        assert!(!table.cancel(&id, CancelReason::Shed));
        assert_eq!(
            pending.wait(Duration::from_secs(1)).await.unwrap_err(),
            WaitError::Cancelled(CancelReason::Shed)
        );
    }

    #[tokio::test]
    async fn concurrent_resolvers_deliver_once() {
        let table = CorrelationTable::new();
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();

        let tasks: Vec<_> = (0..16u16)
            .map(|i| {
                let table = table.clone();
                let id = id.clone();
                tokio::spawn(async move { table.resolve(Response::new(id, 200 + i)).is_ok() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(pending.wait(Duration::from_secs(1)).await.is_ok());
    }
}
