//! Response submission endpoint.
//!
//! The only way handler-side code reaches the correlation table. A
//! [`Submitter`] is cheap to clone and safe to call from any task or thread.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use thiserror::Error;

use crate::correlation::table::{CorrelationError, CorrelationTable};
use crate::correlation::RequestId;
use crate::event::Response;
use crate::observability::metrics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("unknown request id: {0}")]
    UnknownRequestId(RequestId),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Completes pending requests with externally produced responses.
#[derive(Debug, Clone)]
pub struct Submitter {
    table: CorrelationTable,
}

impl Submitter {
    pub fn new(table: CorrelationTable) -> Self {
        Self { table }
    }

    /// Validate `response` and deliver it to its waiting request.
    ///
    /// A malformed response leaves the slot pending so the worker can retry.
    pub fn submit(&self, response: Response) -> Result<(), SubmitError> {
        if let Err(err) = validate(&response) {
            tracing::warn!(request_id = %response.request_id, error = %err, "Rejected malformed response");
            metrics::record_response_rejected("malformed");
            return Err(err);
        }

        let request_id = response.request_id.clone();
        match self.table.resolve(response) {
            Ok(age) => {
                tracing::debug!(request_id = %request_id, pending_ms = age.as_millis() as u64, "Response delivered");
                Ok(())
            }
            Err(CorrelationError::Unknown(id)) | Err(CorrelationError::Duplicate(id)) => {
                tracing::warn!(request_id = %id, "Discarded response for unknown or settled request");
                metrics::record_response_rejected("unknown_id");
                Err(SubmitError::UnknownRequestId(id))
            }
            Err(CorrelationError::Closed) => {
                metrics::record_response_rejected("unknown_id");
                Err(SubmitError::UnknownRequestId(request_id))
            }
        }
    }
}

/// Reject responses that could not be written back out over HTTP.
fn validate(response: &Response) -> Result<(), SubmitError> {
    if response.request_id.as_str().is_empty() {
        return Err(SubmitError::Malformed("empty request id".into()));
    }

    StatusCode::from_u16(response.status)
        .map_err(|_| SubmitError::Malformed(format!("invalid status code {}", response.status)))?;

    for (name, value) in response.headers.pairs() {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| SubmitError::Malformed(format!("invalid header name '{}'", name)))?;
        HeaderValue::from_str(value)
            .map_err(|_| SubmitError::Malformed(format!("invalid value for header '{}'", name)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_completes_pending_request() {
        let table = CorrelationTable::new();
        let submitter = Submitter::new(table.clone());
        let id = RequestId::generate();
        let pending = table.register(id.clone()).unwrap();

        submitter
            .submit(Response::new(id.clone(), 200).body("ok"))
            .unwrap();
        assert_eq!(
            submitter.submit(Response::new(id.clone(), 200)),
            Err(SubmitError::UnknownRequestId(id))
        );

        let response = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(response.body, b"ok");
    }

    #[test]
    fn malformed_response_keeps_slot_pending() {
        let table = CorrelationTable::new();
        let submitter = Submitter::new(table.clone());
        let id = RequestId::generate();
        let _pending = table.register(id.clone()).unwrap();

        let bad_status = submitter.submit(Response::new(id.clone(), 42));
        assert!(matches!(bad_status, Err(SubmitError::Malformed(_))));

        let bad_header = submitter.submit(Response::new(id.clone(), 200).header("bad name", "x"));
        assert!(matches!(bad_header, Err(SubmitError::Malformed(_))));

        let bad_value = submitter.submit(Response::new(id.clone(), 200).header("x-ok", "line\nbreak"));
        assert!(matches!(bad_value, Err(SubmitError::Malformed(_))));

        assert!(table.is_pending(&id));
    }

    #[test]
    fn empty_id_is_malformed() {
        let submitter = Submitter::new(CorrelationTable::new());
        assert!(matches!(
            submitter.submit(Response::new(RequestId::from(""), 200)),
            Err(SubmitError::Malformed(_))
        ));
    }
}
