//! Event envelope construction.
//!
//! # Responsibilities
//! - Read the request body once, bounded by `envelope.max_body_bytes`
//! - Normalize header keys to lowercase
//! - Derive client/server addresses and scheme
//! - Produce an immutable [`Event`]
//!
//! # Design Decisions
//! - Bodies over the cap are truncated and flagged with `more_body`; the
//!   remainder is not delivered (streaming bodies are not supported)
//! - `build` is pure: the receive timestamp is captured at intake, so the
//!   same raw request always yields the same event
//! - Headers are copied verbatim apart from key case; no synthetic headers

use axum::body::Body;
use axum::http::{header, request, HeaderMap, Method, Uri};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::time::SystemTime;

use crate::correlation::RequestId;
use crate::event::headers::Headers;
use crate::event::types::{Event, PeerAddress};

/// An inbound request as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// More body was available than the cap allowed.
    pub body_truncated: bool,
    pub peer: Option<SocketAddr>,
    /// Request arrived over TLS (terminated upstream of the bridge).
    pub secure: bool,
    pub received_at: SystemTime,
}

impl RawRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Vec::new(),
            body_truncated: false,
            peer: None,
            secure: false,
            received_at: SystemTime::now(),
        }
    }

    /// Assemble from request parts and an already-read body.
    pub fn from_parts(parts: &request::Parts, body: Vec<u8>, body_truncated: bool) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
            body_truncated,
            peer: None,
            secure: parts.uri.scheme_str() == Some("https"),
            received_at: SystemTime::now(),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Read at most `limit` bytes of a body.
///
/// Returns the bytes read and whether the body had more data past the cap.
pub async fn read_body(body: Body, limit: usize) -> Result<(Vec<u8>, bool), axum::Error> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok((buf, false))
}

/// Builds events from raw requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeBuilder;

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, raw: RawRequest, request_id: RequestId) -> Event {
        let scheme = if raw.secure { "https" } else { "http" };
        let default_port = if raw.secure { 443 } else { 80 };

        let client_address = raw
            .peer
            .map(|addr| PeerAddress::new(addr.ip().to_string(), addr.port()))
            .unwrap_or_else(|| PeerAddress::new("127.0.0.1", 0));

        let authority = raw
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| raw.uri.authority().map(|a| a.as_str()))
            .unwrap_or("");
        let server_address = split_host_port(authority, default_port);

        Event {
            request_id,
            method: raw.method.as_str().to_string(),
            path: raw.uri.path().to_string(),
            query: raw.uri.query().unwrap_or_default().to_string(),
            scheme: scheme.to_string(),
            headers: Headers::from(&raw.headers),
            client_address,
            server_address,
            body: raw.body,
            more_body: raw.body_truncated,
            received_at: raw.received_at,
        }
    }
}

fn split_host_port(value: &str, default_port: u16) -> PeerAddress {
    if value.is_empty() {
        return PeerAddress::new("localhost", default_port);
    }

    if let Some(rest) = value.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port);
            return PeerAddress::new(host, port);
        }
    }

    match value.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') => match port.parse() {
            Ok(port) => PeerAddress::new(host, port),
            Err(_) => PeerAddress::new(value, default_port),
        },
        _ => PeerAddress::new(value, default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn raw(uri: &str) -> RawRequest {
        RawRequest::new(Method::POST, uri.parse().unwrap())
    }

    #[test]
    fn builds_event_fields() {
        let request = raw("/api/items?limit=5")
            .with_header(header::HOST, HeaderValue::from_static("example.com:8443"))
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body("hello")
            .with_peer("10.0.0.7:51000".parse().unwrap());

        let event = EnvelopeBuilder::new().build(request, RequestId::from("1-1"));

        assert_eq!(event.request_id.as_str(), "1-1");
        assert_eq!(event.method, "POST");
        assert_eq!(event.path, "/api/items");
        assert_eq!(event.query, "limit=5");
        assert_eq!(event.scheme, "http");
        assert_eq!(event.client_address, PeerAddress::new("10.0.0.7", 51000));
        assert_eq!(event.server_address, PeerAddress::new("example.com", 8443));
        assert_eq!(event.headers.get("content-type"), Some("text/plain"));
        assert_eq!(event.body, b"hello");
        assert!(!event.more_body);
    }

    #[test]
    fn missing_addresses_fall_back_to_defaults() {
        let event = EnvelopeBuilder::new().build(raw("/"), RequestId::from("1-2"));
        assert_eq!(event.client_address, PeerAddress::new("127.0.0.1", 0));
        assert_eq!(event.server_address, PeerAddress::new("localhost", 80));
        assert!(event.headers.is_empty());
        assert_eq!(event.query, "");
    }

    #[test]
    fn build_is_deterministic() {
        let request = raw("/x").with_body("abc");
        let a = EnvelopeBuilder::new().build(request.clone(), RequestId::from("1-3"));
        let b = EnvelopeBuilder::new().build(request, RequestId::from("1-3"));
        assert_eq!(a, b);
    }

    #[test]
    fn truncation_sets_more_body() {
        let mut request = raw("/upload").with_body(vec![0u8; 4]);
        request.body_truncated = true;
        let event = EnvelopeBuilder::new().build(request, RequestId::from("1-4"));
        assert!(event.more_body);
    }

    #[test]
    fn splits_host_port_variants() {
        assert_eq!(split_host_port("[::1]:9000", 80), PeerAddress::new("::1", 9000));
        assert_eq!(split_host_port("[::1]", 80), PeerAddress::new("::1", 80));
        assert_eq!(split_host_port("example.com", 443), PeerAddress::new("example.com", 443));
        assert_eq!(split_host_port("example.com:abc", 80), PeerAddress::new("example.com:abc", 80));
    }

    #[tokio::test]
    async fn read_body_respects_cap() {
        let (bytes, truncated) = read_body(Body::from("hello world"), 5).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert!(truncated);

        let (bytes, truncated) = read_body(Body::from("hello"), 5).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert!(!truncated);

        let (bytes, truncated) = read_body(Body::empty(), 5).await.unwrap();
        assert!(bytes.is_empty());
        assert!(!truncated);
    }
}
