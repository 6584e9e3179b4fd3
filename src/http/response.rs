//! Outbound response conversion.
//!
//! # Responsibilities
//! - Write a bridge [`Response`] out as an HTTP response
//! - Map [`BridgeError`] to its status code and plain-text body
//! - Stamp every reply with `x-request-id` when one was assigned
//!
//! # Design Decisions
//! - Hop-by-hop headers and content-length from handlers are dropped; the
//!   server frames the body itself

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;

use crate::bridge::BridgeError;
use crate::event::Response;
use crate::http::request::X_REQUEST_ID;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "content-length",
];

/// Build the HTTP response for a resolved request.
pub fn into_http_response(response: Response) -> axum::response::Response {
    let status = match StatusCode::from_u16(response.status) {
        Ok(status) => status,
        Err(_) => return internal_error(&response),
    };

    let mut out = axum::response::Response::new(Body::from(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in response.headers.pairs() {
        if HOP_BY_HOP.contains(&name) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(request_id = %response.request_id, header = name, "Dropped unwritable header"),
        }
    }

    if let Ok(id) = HeaderValue::from_str(response.request_id.as_str()) {
        headers.insert(X_REQUEST_ID, id);
    }
    out
}

fn internal_error(response: &Response) -> axum::response::Response {
    tracing::error!(request_id = %response.request_id, status = response.status, "Response has invalid status");
    BridgeError::Internal(format!("invalid status {}", response.status)).into_response()
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let mut response = (status, self.to_string()).into_response();
        if matches!(self, BridgeError::CapacityExceeded { .. } | BridgeError::Shed) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
