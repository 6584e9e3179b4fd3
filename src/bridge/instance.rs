//! One running bridge instance.
//!
//! # Request Journey
//! ```text
//! Received → admit() ─────────── CapacityExceeded / ServerStopped
//!          → Admitted → build Event → register slot
//!          → hand_off ────────────── NoHandlerRegistered / ServerStopped
//!          → HandedOff → wait(response timeout)
//!          → Resolved | Expired (504) | ServerStopped | Shed
//! ```
//!
//! Every admitted request ends in exactly one terminal state. The admission
//! permit and the pending slot are both released by `Drop`, so an early
//! return or a dropped future (client disconnect) cleans up the same way.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::admission::{AdmissionController, AdmissionPermit, ConcurrencySnapshot};
use crate::bridge::error::BridgeError;
use crate::config::{BridgeConfig, DispatchMode};
use crate::correlation::{
    CancelReason, CorrelationError, CorrelationTable, RequestId, SubmitError, Submitter,
};
use crate::dispatch::{DispatchError, Dispatcher, PushConsumer, Strategy};
use crate::event::{EnvelopeBuilder, Event, RawRequest, Response};
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, spans};
use crate::routing::HandlerRegistry;

/// Point-in-time view of a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub running: bool,
    pub mode: DispatchMode,
    /// `"<in_use>/<capacity>"`.
    pub concurrency: String,
    pub in_use: usize,
    pub capacity: usize,
    pub pending: usize,
    pub queued: usize,
}

/// What a stop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReport {
    /// All in-flight requests finished within the grace period.
    pub drained: bool,
    /// Pending requests force-resolved with ServerStopped.
    pub cancelled: usize,
    /// Buffered events discarded.
    pub dropped_events: usize,
}

/// State owned by one start()/stop() cycle.
#[derive(Debug)]
pub struct BridgeCore {
    config: BridgeConfig,
    admission: AdmissionController,
    table: CorrelationTable,
    submitter: Submitter,
    envelope: EnvelopeBuilder,
    strategy: Strategy,
    /// Stop accepting intake.
    draining: Shutdown,
    /// Cancel everything still waiting.
    cancel: Shutdown,
}

impl BridgeCore {
    pub fn new(config: BridgeConfig, registry: HandlerRegistry) -> Self {
        let table = CorrelationTable::new();
        let cancel = Shutdown::new();
        let strategy = Strategy::build(&config.dispatch, registry, table.clone(), cancel.subscribe());

        Self {
            admission: AdmissionController::new(config.admission.capacity),
            submitter: Submitter::new(table.clone()),
            envelope: EnvelopeBuilder::new(),
            table,
            strategy,
            draining: Shutdown::new(),
            cancel,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Wait for an admission permit.
    pub async fn admit(&self) -> Result<AdmissionPermit, BridgeError> {
        let start = Instant::now();
        self.admission
            .acquire(self.config.admission.acquire_timeout())
            .await
            .map_err(|err| {
                let err = BridgeError::from(err);
                metrics::record_request(err.outcome(), start);
                err
            })
    }

    /// Run an admitted request to its terminal state.
    pub async fn dispatch(
        &self,
        permit: AdmissionPermit,
        raw: RawRequest,
    ) -> Result<Response, BridgeError> {
        let start = Instant::now();
        let request_id = RequestId::generate();
        let span = spans::request_span(&request_id, raw.method.as_str(), raw.uri.path());

        async move {
            let result = self.run(raw, request_id).await;
            drop(permit);

            match &result {
                Ok(response) => {
                    tracing::debug!(status = response.status, "Request resolved");
                    metrics::record_request("resolved", start);
                }
                Err(err) => {
                    tracing::info!(outcome = err.outcome(), error = %err, "Request failed");
                    metrics::record_request(err.outcome(), start);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Admit and dispatch in one call.
    pub async fn process(&self, raw: RawRequest) -> Result<Response, BridgeError> {
        let permit = self.admit().await?;
        self.dispatch(permit, raw).await
    }

    async fn run(&self, raw: RawRequest, request_id: RequestId) -> Result<Response, BridgeError> {
        let event = Arc::new(self.envelope.build(raw, request_id.clone()));

        let pending = self.table.register(request_id).map_err(|err| match err {
            CorrelationError::Closed => BridgeError::ServerStopped,
            other => {
                tracing::error!(error = %other, "Correlation invariant violated");
                BridgeError::Internal(other.to_string())
            }
        })?;

        // On failure `pending` drops here and expires the slot.
        let dispatcher = self.strategy.dispatcher();
        dispatcher.hand_off(event)?;

        // A timed-out or disconnected caller takes its unconsumed event with it.
        let _queued = Withdraw {
            dispatcher,
            id: pending.request_id().clone(),
        };

        Ok(pending.wait(self.config.timeouts.response()).await?)
    }

    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    pub fn submit(&self, response: Response) -> Result<(), SubmitError> {
        self.submitter.submit(response)
    }

    /// Fetch a batch of events (poll mode only).
    pub async fn fetch_events(
        &self,
        wait: Option<Duration>,
        max: Option<usize>,
    ) -> Result<Vec<Arc<Event>>, DispatchError> {
        self.strategy.as_poll()?.fetch(wait, max).await
    }

    /// Consumer handle for the push queue (push mode only).
    pub fn push_consumer(&self) -> Result<PushConsumer, DispatchError> {
        Ok(self.strategy.as_push()?.consumer())
    }

    pub fn mode(&self) -> DispatchMode {
        self.strategy.mode()
    }

    pub fn snapshot(&self) -> ConcurrencySnapshot {
        self.admission.snapshot()
    }

    pub fn status(&self) -> BridgeStatus {
        let snapshot = self.snapshot();
        BridgeStatus {
            running: !self.draining.is_triggered(),
            mode: self.mode(),
            concurrency: snapshot.to_string(),
            in_use: snapshot.in_use,
            capacity: snapshot.capacity,
            pending: self.table.len(),
            queued: self.strategy.dispatcher().queued(),
        }
    }

    /// Fires when the instance stops accepting intake.
    pub fn draining(&self) -> &Shutdown {
        &self.draining
    }

    /// Fires once pending requests have been cancelled.
    pub fn cancelled(&self) -> &Shutdown {
        &self.cancel
    }

    /// Stop this instance: refuse new work, give in-flight requests up to
    /// `grace`, then cancel whatever is left.
    pub async fn shutdown(&self, grace: Duration) -> StopReport {
        self.draining.trigger();
        self.admission.close();

        let drained = self.admission.wait_idle(grace).await;
        if !drained {
            tracing::warn!(
                in_flight = self.admission.in_use(),
                grace_ms = grace.as_millis() as u64,
                "Grace period elapsed with requests in flight"
            );
        }

        // Buffered events go first: once their callers are woken they withdraw them.
        let dropped_events = self.strategy.dispatcher().shutdown();
        let cancelled = self.table.drain_all(CancelReason::ServerStopping);
        self.cancel.trigger();

        StopReport {
            drained,
            cancelled,
            dropped_events,
        }
    }

    /// Synchronous best-effort stop, used when the owner goes away.
    pub fn abort(&self) {
        self.draining.trigger();
        self.admission.close();
        self.strategy.dispatcher().shutdown();
        self.table.drain_all(CancelReason::ServerStopping);
        self.cancel.trigger();
    }
}

/// Withdraws a handed-off event from the dispatcher's buffer on drop.
struct Withdraw<'a> {
    dispatcher: &'a dyn Dispatcher,
    id: RequestId,
}

impl Drop for Withdraw<'_> {
    fn drop(&mut self) {
        if self.dispatcher.withdraw(&self.id) {
            tracing::debug!(request_id = %self.id, "Withdrew unconsumed event");
        }
    }
}
