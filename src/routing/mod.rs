//! Handler routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (any time):
//!     register(pattern, handler)
//!     → matcher.rs (parse into Exact or Subtree pattern)
//!     → router.rs (copy-on-write swap of the route table)
//!
//! Lookup (per event):
//!     event.path
//!     → exact patterns first
//!     → then the longest matching subtree pattern
//!     → Return: handler or NoMatch (404)
//! ```
//!
//! # Design Decisions
//! - Route table is immutable per snapshot; readers never lock
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same path always matches same pattern
//! - Last registration for a pattern wins

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{HandlerRegistry, RouteMatch};
