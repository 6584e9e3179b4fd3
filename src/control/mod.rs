//! Control API for out-of-process workers.
//!
//! # Endpoints
//! - `GET /control/status`: instance status
//! - `GET /control/events?wait_ms=&max=`: long-poll a batch of events (poll mode)
//! - `POST /control/responses`: submit a response
//!
//! # Design Decisions
//! - Served on its own listener, off by default
//! - Stays up through the grace period so workers can finish pending
//!   requests; closes once they have been cancelled

pub mod client;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::BridgeCore;
use self::handlers::{get_events, get_status, post_response};

pub use client::{ClientError, ControlClient};

pub fn control_router(core: Arc<BridgeCore>) -> Router {
    Router::new()
        .route("/control/status", get(get_status))
        .route("/control/events", get(get_events))
        .route("/control/responses", post(post_response))
        .with_state(core)
        .layer(TraceLayer::new_for_http())
}

/// Serve the control API until the instance's pending requests are cancelled.
pub async fn serve_control(listener: TcpListener, core: Arc<BridgeCore>) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let mut cancelled = core.cancelled().subscribe();
    tracing::info!(address = %addr, "Control listener starting");

    axum::serve(listener, control_router(core))
        .with_graceful_shutdown(async move { cancelled.recv().await })
        .await?;

    tracing::info!(address = %addr, "Control listener stopped");
    Ok(())
}
