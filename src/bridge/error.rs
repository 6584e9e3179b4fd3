//! Bridge error types.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::admission::AdmissionError;
use crate::config::ValidationError;
use crate::correlation::{CancelReason, WaitError};
use crate::dispatch::DispatchError;

/// Terminal failure of one request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Server is at capacity, please try again later")]
    CapacityExceeded { capacity: usize },

    #[error("Request processing timed out")]
    HandlerTimeout(Duration),

    #[error("No handler registered for this path")]
    NoHandlerRegistered { path: String },

    #[error("Server is shutting down")]
    ServerStopped,

    #[error("Server is overloaded, request was shed")]
    Shed,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(String),
}

impl BridgeError {
    /// Status the waiting HTTP caller receives.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::HandlerTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::NoHandlerRegistered { .. } => StatusCode::NOT_FOUND,
            BridgeError::ServerStopped => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::Shed => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Low-cardinality label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            BridgeError::CapacityExceeded { .. } => "capacity_exceeded",
            BridgeError::HandlerTimeout(_) => "timeout",
            BridgeError::NoHandlerRegistered { .. } => "no_handler",
            BridgeError::ServerStopped => "server_stopped",
            BridgeError::Shed => "shed",
            BridgeError::BadRequest(_) => "bad_request",
            BridgeError::Internal(_) => "internal",
        }
    }
}

impl From<AdmissionError> for BridgeError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::CapacityExceeded { capacity } => BridgeError::CapacityExceeded { capacity },
            AdmissionError::Closed => BridgeError::ServerStopped,
        }
    }
}

impl From<DispatchError> for BridgeError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoHandler { path } => BridgeError::NoHandlerRegistered { path },
            DispatchError::Stopped => BridgeError::ServerStopped,
            other @ DispatchError::WrongMode { .. } => BridgeError::Internal(other.to_string()),
        }
    }
}

impl From<WaitError> for BridgeError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::TimedOut(after) => BridgeError::HandlerTimeout(after),
            WaitError::Cancelled(CancelReason::ServerStopping) => BridgeError::ServerStopped,
            WaitError::Cancelled(CancelReason::Shed) => BridgeError::Shed,
        }
    }
}

/// Failure of a start/stop call.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("bridge is already running")]
    AlreadyRunning,

    #[error("bridge is not running")]
    NotRunning,

    #[error("invalid configuration: {}", format_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
