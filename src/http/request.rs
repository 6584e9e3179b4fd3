//! Inbound request conversion.
//!
//! # Responsibilities
//! - Read the body once, bounded by the envelope cap
//! - Attach the peer address from the connection
//! - Hand the bridge a [`RawRequest`]

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

use crate::bridge::BridgeError;
use crate::event::{read_body, RawRequest};

/// Header carrying the bridge's request id on every reply.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Convert an axum request into the bridge's raw form.
pub async fn into_raw_request(request: Request<Body>, max_body_bytes: usize) -> Result<RawRequest, BridgeError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let (bytes, truncated) = read_body(body, max_body_bytes)
        .await
        .map_err(|err| BridgeError::BadRequest(format!("failed to read request body: {}", err)))?;

    if truncated {
        tracing::debug!(path = %parts.uri.path(), limit = max_body_bytes, "Request body truncated at cap");
    }

    let raw = RawRequest::from_parts(&parts, bytes, truncated);
    Ok(match peer {
        Some(addr) => raw.with_peer(addr),
        None => raw,
    })
}
