//! Request/response bridge.
//!
//! # Data Flow
//! ```text
//! Bridge (owned by the embedder)
//!     ├─ HandlerRegistry     survives restarts
//!     └─ current instance    ArcSwapOption<BridgeCore>
//!            start(): validate → bind → new BridgeCore → serve intake/control
//!            stop():  drain → cancel → join listeners → discard BridgeCore
//! ```
//!
//! # Design Decisions
//! - No process-wide state: independent `Bridge` values can coexist
//! - Each start() builds fresh admission, correlation and queue state
//! - start()/stop() are serialized by a lifecycle mutex; request paths
//!   only read the current instance and never take it

pub mod error;
pub mod instance;

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admission::ConcurrencySnapshot;
use crate::config::{validate_config, BridgeConfig};
use crate::correlation::{SubmitError, Submitter};
use crate::dispatch::{DispatchError, EventHandler, PushConsumer};
use crate::event::{Event, Response};
use crate::lifecycle::startup::{self, BoundAddrs};
use crate::routing::HandlerRegistry;

pub use error::{BridgeError, LifecycleError};
pub use instance::{BridgeCore, BridgeStatus, StopReport};

/// Time allowed for listener tasks to exit once their instance is stopped.
const LISTENER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    addrs: BoundAddrs,
    tasks: Vec<(&'static str, JoinHandle<std::io::Result<()>>)>,
}

/// An HTTP-to-event bridge.
pub struct Bridge {
    config: BridgeConfig,
    registry: HandlerRegistry,
    current: ArcSwapOption<BridgeCore>,
    lifecycle: Mutex<Option<Running>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            current: ArcSwapOption::empty(),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Register a handler for a path pattern. Patterns ending in `/` match a
    /// subtree; anything else matches exactly. Takes effect immediately,
    /// also while running.
    pub fn register_handler(&self, pattern: &str, handler: impl EventHandler) {
        self.registry.register(pattern, Arc::new(handler));
    }

    /// Register the handler for paths no other pattern matches.
    pub fn register_default_handler(&self, handler: impl EventHandler) {
        self.registry.register("/", Arc::new(handler));
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Bind listeners and start serving.
    pub async fn start(&self) -> Result<BoundAddrs, LifecycleError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(LifecycleError::AlreadyRunning);
        }

        validate_config(&self.config).map_err(LifecycleError::InvalidConfig)?;
        let listeners = startup::bind_listeners(&self.config).await?;
        let addrs = listeners.addrs()?;

        let core = Arc::new(BridgeCore::new(self.config.clone(), self.registry.clone()));
        let mut tasks = vec![(
            "intake",
            tokio::spawn(crate::http::server::serve_intake(listeners.intake, Arc::clone(&core))),
        )];
        if let Some(control) = listeners.control {
            tasks.push((
                "control",
                tokio::spawn(crate::control::serve_control(control, Arc::clone(&core))),
            ));
        }

        self.current.store(Some(core));
        *lifecycle = Some(Running { addrs, tasks });

        tracing::info!(
            intake = %addrs.intake,
            control = ?addrs.control,
            mode = %self.config.dispatch.mode,
            capacity = self.config.admission.capacity,
            "Bridge started"
        );
        Ok(addrs)
    }

    /// Stop with the configured grace period.
    pub async fn stop(&self) -> Result<StopReport, LifecycleError> {
        self.stop_within(self.config.timeouts.shutdown_grace()).await
    }

    /// Stop accepting requests, give in-flight ones up to `grace`, then
    /// cancel the rest and release the listeners.
    pub async fn stop_within(&self, grace: Duration) -> Result<StopReport, LifecycleError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let running = lifecycle.take().ok_or(LifecycleError::NotRunning)?;
        let core = self.current.load_full().ok_or(LifecycleError::NotRunning)?;

        tracing::info!(grace_ms = grace.as_millis() as u64, "Stopping bridge");
        let report = core.shutdown(grace).await;
        self.current.store(None);

        for (name, mut task) in running.tasks {
            match tokio::time::timeout(LISTENER_JOIN_TIMEOUT, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(err))) => tracing::error!(listener = name, error = %err, "Listener failed"),
                Ok(Err(err)) => tracing::error!(listener = name, error = %err, "Listener task panicked"),
                Err(_) => {
                    tracing::warn!(listener = name, "Listener did not exit in time, aborting");
                    task.abort();
                }
            }
        }

        tracing::info!(
            drained = report.drained,
            cancelled = report.cancelled,
            dropped_events = report.dropped_events,
            "Bridge stopped"
        );
        Ok(report)
    }

    pub fn is_running(&self) -> bool {
        self.current.load().is_some()
    }

    /// The running instance, if any.
    pub fn core(&self) -> Option<Arc<BridgeCore>> {
        self.current.load_full()
    }

    /// Complete a pending request.
    pub fn submit_response(&self, response: Response) -> Result<(), SubmitError> {
        match self.current.load_full() {
            Some(core) => core.submit(response),
            None => Err(SubmitError::UnknownRequestId(response.request_id)),
        }
    }

    /// Submission handle bound to the current instance.
    pub fn submitter(&self) -> Option<Submitter> {
        self.current.load_full().map(|core| core.submitter())
    }

    /// Fetch a batch of events (poll mode).
    pub async fn fetch_events(
        &self,
        wait: Option<Duration>,
        max: Option<usize>,
    ) -> Result<Vec<Arc<Event>>, DispatchError> {
        let core = self.current.load_full().ok_or(DispatchError::Stopped)?;
        core.fetch_events(wait, max).await
    }

    /// Consumer for the push queue (push mode). Valid until the next stop.
    pub fn push_consumer(&self) -> Result<PushConsumer, DispatchError> {
        let core = self.current.load_full().ok_or(DispatchError::Stopped)?;
        core.push_consumer()
    }

    pub fn concurrency_snapshot(&self) -> ConcurrencySnapshot {
        match self.current.load_full() {
            Some(core) => core.snapshot(),
            None => ConcurrencySnapshot {
                in_use: 0,
                capacity: self.config.admission.capacity,
            },
        }
    }

    pub fn status(&self) -> BridgeStatus {
        match self.current.load_full() {
            Some(core) => core.status(),
            None => BridgeStatus {
                running: false,
                mode: self.config.dispatch.mode,
                concurrency: self.concurrency_snapshot().to_string(),
                in_use: 0,
                capacity: self.config.admission.capacity,
                pending: 0,
                queued: 0,
            },
        }
    }

    /// Bound addresses while running.
    pub async fn addrs(&self) -> Option<BoundAddrs> {
        self.lifecycle.lock().await.as_ref().map(|running| running.addrs)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(core) = self.current.swap(None) {
            core.abort();
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("mode", &self.config.dispatch.mode)
            .field("running", &self.is_running())
            .field("registry", &self.registry)
            .finish()
    }
}
