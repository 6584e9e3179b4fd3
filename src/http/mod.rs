//! HTTP intake subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum fallback handler, trace layer)
//!     → admission (permit before the body is read)
//!     → request.rs (bounded body read → RawRequest)
//!     → BridgeCore::dispatch (envelope, hand-off, wait)
//!     → response.rs (Response or BridgeError → HTTP response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{intake_router, serve_intake};
