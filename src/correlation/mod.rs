//! Request/response correlation subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → request_id.rs (generate unique id)
//!     → table.rs (register → PendingResponse held by the intake handler)
//!     → [event handed off, processed out of band]
//!     → submit.rs (Submitter::submit validates the response)
//!     → table.rs (resolve: remove slot, deliver once)
//!     → PendingResponse::wait returns to the intake handler
//!
//! Timeout / disconnect: PendingResponse expires its slot.
//! Shutdown: table.drain_all cancels every remaining slot.
//! ```

pub mod request_id;
pub mod submit;
pub mod table;

pub use request_id::RequestId;
pub use submit::{SubmitError, Submitter};
pub use table::{CancelReason, CorrelationError, CorrelationTable, PendingResponse, WaitError};
