//! Direct callback strategy.
//!
//! # Responsibilities
//! - Resolve the handler for the event path (404 when none)
//! - Run it on its own task, racing the instance's cancel signal
//! - Turn errors and panics into 500 replies
//! - Submit the reply through the normal submission path
//!
//! # Design Decisions
//! - The response timeout lives with the waiter, not here: a slow handler
//!   keeps running after its caller got 504 and its late reply is discarded
//! - On stop the handler future is dropped at its next await point

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::config::DispatchMode;
use crate::correlation::{RequestId, SubmitError, Submitter};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::event::{Event, Response};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::HandlerRegistry;

#[derive(Debug)]
pub struct CallbackDispatcher {
    registry: HandlerRegistry,
    submitter: Submitter,
    stop: ShutdownSignal,
}

impl CallbackDispatcher {
    pub fn new(registry: HandlerRegistry, submitter: Submitter, stop: ShutdownSignal) -> Self {
        Self {
            registry,
            submitter,
            stop,
        }
    }
}

impl Dispatcher for CallbackDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Callback
    }

    fn hand_off(&self, event: Arc<Event>) -> Result<(), DispatchError> {
        let route = self
            .registry
            .resolve(&event.path)
            .ok_or_else(|| DispatchError::NoHandler {
                path: event.path.clone(),
            })?;

        let submitter = self.submitter.clone();
        let mut stop = self.stop.clone();
        let request_id = event.request_id.clone();
        tracing::debug!(request_id = %request_id, pattern = %route.pattern, "Invoking handler");

        tokio::spawn(async move {
            let handler = route.handler;
            let invocation = AssertUnwindSafe(async move { handler.handle(event).await }).catch_unwind();

            let response = tokio::select! {
                result = invocation => match result {
                    Ok(Ok(reply)) => reply.into_response(request_id.clone()),
                    Ok(Err(err)) => {
                        tracing::warn!(request_id = %request_id, error = %err, "Handler returned an error");
                        metrics::record_handler_failure("error");
                        failure_response(&request_id)
                    }
                    Err(_) => {
                        tracing::error!(request_id = %request_id, "Handler panicked");
                        metrics::record_handler_failure("panic");
                        failure_response(&request_id)
                    }
                },
                _ = stop.recv() => {
                    tracing::debug!(request_id = %request_id, "Handler interrupted by shutdown");
                    return;
                }
            };

            deliver(&submitter, &request_id, response);
        });

        Ok(())
    }
}

fn failure_response(request_id: &RequestId) -> Response {
    Response::new(request_id.clone(), 500)
        .header("content-type", "text/plain")
        .body("Internal Server Error")
}

fn deliver(submitter: &Submitter, request_id: &RequestId, response: Response) {
    match submitter.submit(response) {
        Ok(()) => {}
        Err(SubmitError::Malformed(reason)) => {
            tracing::warn!(request_id = %request_id, reason = %reason, "Handler produced an unwritable reply");
            metrics::record_handler_failure("malformed");
            if submitter.submit(failure_response(request_id)).is_err() {
                tracing::debug!(request_id = %request_id, "Request settled before failure reply");
            }
        }
        Err(SubmitError::UnknownRequestId(_)) => {
            tracing::debug!(request_id = %request_id, "Handler finished after its request settled");
        }
    }
}
