//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Intake request
//!     → gate.rs (acquire permit, bounded wait)
//!         → permit granted: request proceeds, permit held until it finishes
//!         → timeout: 503, request never handed off
//!         → closed: 503, bridge is stopping
//! ```
//!
//! # Design Decisions
//! - Permits are RAII guards; every exit path releases exactly once
//! - A fresh gate is built per start(); nothing carries across runs
//! - In-flight count is tracked alongside the semaphore so it stays exact
//!   after the gate is closed

pub mod gate;

pub use gate::{AdmissionController, AdmissionError, AdmissionPermit, ConcurrencySnapshot};
