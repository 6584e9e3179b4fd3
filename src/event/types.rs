//! Event and response value types.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::correlation::RequestId;
use crate::event::headers::Headers;

/// Host/port pair describing one end of the intake connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Snapshot of an inbound request at hand-off time.
///
/// Built once by the envelope builder and shared as `Arc<Event>`; nothing
/// mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub request_id: RequestId,
    pub method: String,
    pub path: String,
    pub query: String,
    pub scheme: String,
    pub headers: Headers,
    pub client_address: PeerAddress,
    pub server_address: PeerAddress,
    #[serde(with = "wire_body")]
    pub body: Vec<u8>,
    /// Set when the intake body cap cut the body short.
    pub more_body: bool,
    pub received_at: SystemTime,
}

/// Result of processing an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, with = "wire_body")]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(request_id: RequestId, status: u16) -> Self {
        Self {
            request_id,
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// What a handler produces; the bridge attaches the request id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200).body(body)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn into_response(self, request_id: RequestId) -> Response {
        Response {
            request_id,
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Bodies travel as a string when they are valid UTF-8 and as a byte array
/// otherwise; both forms are accepted on input.
mod wire_body {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(body) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.collect_seq(body),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireBody {
        Text(String),
        Bytes(Vec<u8>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match WireBody::deserialize(deserializer)? {
            WireBody::Text(text) => text.into_bytes(),
            WireBody::Bytes(bytes) => bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_accepts_text_or_byte_bodies() {
        let text: Response =
            serde_json::from_str(r#"{"request_id":"1-1","status":200,"body":"hi"}"#).unwrap();
        let bytes: Response =
            serde_json::from_str(r#"{"request_id":"1-1","status":200,"body":[104,105]}"#).unwrap();
        assert_eq!(text, bytes);
        assert!(text.headers.is_empty());
    }

    #[test]
    fn binary_body_serializes_as_array() {
        let response = Response::new("1-1".into(), 200).body(vec![0xff, 0x00]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["body"], serde_json::json!([255, 0]));
    }

    #[test]
    fn reply_carries_request_id() {
        let response = Reply::ok("done")
            .header("Content-Type", "text/plain")
            .into_response("9-9".into());
        assert_eq!(response.request_id.as_str(), "9-9");
        assert_eq!(response.headers.get("content-type"), Some("text/plain"));
        assert_eq!(response.body, b"done");
    }

    #[test]
    fn peer_address_brackets_ipv6() {
        assert_eq!(PeerAddress::new("::1", 80).to_string(), "[::1]:80");
        assert_eq!(PeerAddress::new("localhost", 80).to_string(), "localhost:80");
    }
}
