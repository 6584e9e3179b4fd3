//! Event model subsystem.
//!
//! # Data Flow
//! ```text
//! axum Request (parts + body)
//!     → envelope.rs (bounded body read, RawRequest)
//!     → envelope.rs (EnvelopeBuilder::build → Event)
//!     → Arc<Event> handed to the active dispatcher
//!
//! Handler / worker output:
//!     Reply (status, headers, body) → Response (with request id)
//!     → correlation table → waiting intake handler
//! ```

pub mod envelope;
pub mod headers;
pub mod types;

pub use envelope::{read_body, EnvelopeBuilder, RawRequest};
pub use headers::Headers;
pub use types::{Event, PeerAddress, Reply, Response};
