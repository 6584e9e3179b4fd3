//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Bind listeners → Build fresh instance → Serve
//!
//! Shutdown (shutdown.rs):
//!     stop() → Draining signal (stop accepting, close admission)
//!           → wait grace for in-flight requests
//!           → Cancel signal (cancel pending slots, wake consumers)
//!           → join listener tasks
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```
//!
//! # Design Decisions
//! - Two separate signals: draining lets in-flight work finish, cancel ends it
//! - Signals are level-triggered (watch), so late subscribers still observe them
//! - Shutdown has timeout: forced cancellation after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
