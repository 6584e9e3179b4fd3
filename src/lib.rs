//! Event bridge.
//!
//! Bridges synchronous HTTP request handling to an asynchronous external
//! engine: requests are admitted under a concurrency budget, handed off as
//! immutable events, and answered when a matching response is submitted.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (intake) ──▶ admission ──▶ event (envelope)
//!                                                          │
//!                                                          ▼
//!                                    correlation ◀── dispatch (callback │ push │ poll)
//!                                    (pending slot)        │
//!                                          ▲               ▼
//!     Client Response                      │         external processing
//!     ◀────────────── http (response) ◀────┴──── Submitter / control API
//!
//!     Cross-cutting: config, lifecycle (start/stop), observability, routing
//! ```

// Core subsystems
pub mod admission;
pub mod bridge;
pub mod correlation;
pub mod dispatch;
pub mod event;
pub mod routing;

// Surfaces
pub mod control;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use bridge::{Bridge, BridgeError, BridgeStatus, LifecycleError, StopReport};
pub use config::BridgeConfig;
pub use correlation::{RequestId, SubmitError, Submitter};
pub use dispatch::{handler_fn, blocking_handler_fn, EventHandler, HandlerError, PushConsumer};
pub use event::{Event, Headers, Reply, Response};
pub use lifecycle::startup::BoundAddrs;
