//! Hand-off strategies.
//!
//! # Data Flow
//! ```text
//! Enveloped Event (Arc<Event>)
//!     → Dispatcher::hand_off
//!         ├─ callback.rs: resolve handler → spawn task → Submitter
//!         ├─ push.rs:     bounded buffer (evict oldest) → PushConsumer
//!         └─ poll.rs:     shared list → fetch(wait, max) batches
//!     → [external processing]
//!     → Submitter::submit → correlation table
//! ```
//!
//! # Design Decisions
//! - One trait, three strategies, chosen once per instance from config
//! - hand_off never blocks: callback spawns, queues only append
//! - Every strategy observes the instance's cancel signal, so no consumer
//!   or handler outlives stop() uninterruptibly (blocking handlers excepted)

pub mod buffer;
pub mod callback;
pub mod handler;
pub mod poll;
pub mod push;

use std::sync::Arc;
use thiserror::Error;

use crate::config::{DispatchConfig, DispatchMode};
use crate::correlation::{CorrelationTable, RequestId, Submitter};
use crate::event::Event;
use crate::lifecycle::ShutdownSignal;
use crate::routing::HandlerRegistry;

pub use callback::CallbackDispatcher;
pub use handler::{
    blocking_handler_fn, handler_fn, BlockingHandler, EchoHandler, EventHandler, FnHandler,
    HandlerError, HandlerFuture,
};
pub use poll::PollDispatcher;
pub use push::{PushConsumer, PushDispatcher};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no handler registered for path {path}")]
    NoHandler { path: String },

    #[error("dispatcher is stopped")]
    Stopped,

    #[error("operation requires {expected} mode, bridge is running in {active} mode")]
    WrongMode {
        expected: DispatchMode,
        active: DispatchMode,
    },
}

/// Hands events off to external processing.
pub trait Dispatcher: Send + Sync {
    fn mode(&self) -> DispatchMode;

    /// Deliver one event. Must not block.
    fn hand_off(&self, event: Arc<Event>) -> Result<(), DispatchError>;

    /// Events buffered and not yet taken by a consumer.
    fn queued(&self) -> usize {
        0
    }

    /// Pull an event back out of the buffer once nobody waits for its
    /// response. Returns false if it was already consumed.
    fn withdraw(&self, _id: &RequestId) -> bool {
        false
    }

    /// Release buffered events. Returns how many were dropped.
    fn shutdown(&self) -> usize {
        0
    }
}

/// The strategy selected for one running instance.
#[derive(Debug)]
pub enum Strategy {
    Callback(CallbackDispatcher),
    Push(PushDispatcher),
    Poll(PollDispatcher),
}

impl Strategy {
    pub fn build(
        config: &DispatchConfig,
        registry: HandlerRegistry,
        table: CorrelationTable,
        stop: ShutdownSignal,
    ) -> Self {
        match config.mode {
            DispatchMode::Callback => {
                Strategy::Callback(CallbackDispatcher::new(registry, Submitter::new(table), stop))
            }
            DispatchMode::Push => Strategy::Push(PushDispatcher::new(config.push_capacity, table, stop)),
            DispatchMode::Poll => Strategy::Poll(PollDispatcher::new(
                config.poll_batch_size,
                config.poll_wait(),
                stop,
            )),
        }
    }

    pub fn dispatcher(&self) -> &dyn Dispatcher {
        match self {
            Strategy::Callback(d) => d,
            Strategy::Push(d) => d,
            Strategy::Poll(d) => d,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.dispatcher().mode()
    }

    pub fn as_poll(&self) -> Result<&PollDispatcher, DispatchError> {
        match self {
            Strategy::Poll(d) => Ok(d),
            other => Err(DispatchError::WrongMode {
                expected: DispatchMode::Poll,
                active: other.mode(),
            }),
        }
    }

    pub fn as_push(&self) -> Result<&PushDispatcher, DispatchError> {
        match self {
            Strategy::Push(d) => Ok(d),
            other => Err(DispatchError::WrongMode {
                expected: DispatchMode::Push,
                active: other.mode(),
            }),
        }
    }
}
