//! HTTP intake server.
//!
//! # Responsibilities
//! - Create the Axum router (every method, every path)
//! - Wire up middleware (tracing)
//! - Bind the router to the instance's listener
//! - Stop accepting when the instance starts draining
//!
//! # Design Decisions
//! - A single fallback handler: routing by path is the bridge's job
//! - Admission happens before the body is read, so a saturated bridge
//!   does not buffer bodies it will reject

use axum::extract::{Request, State};
use axum::response::IntoResponse;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::BridgeCore;
use crate::http::request::into_raw_request;
use crate::http::response::into_http_response;

/// Build the intake router for an instance.
pub fn intake_router(core: Arc<BridgeCore>) -> Router {
    Router::new()
        .fallback(intake_handler)
        .with_state(core)
        .layer(TraceLayer::new_for_http())
}

/// Serve intake until the instance starts draining.
pub async fn serve_intake(listener: TcpListener, core: Arc<BridgeCore>) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let mut draining = core.draining().subscribe();
    tracing::info!(address = %addr, "Intake listener starting");

    let app = intake_router(core).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { draining.recv().await })
        .await?;

    tracing::info!(address = %addr, "Intake listener stopped");
    Ok(())
}

async fn intake_handler(
    State(core): State<Arc<BridgeCore>>,
    request: Request,
) -> axum::response::Response {
    let permit = match core.admit().await {
        Ok(permit) => permit,
        Err(err) => return err.into_response(),
    };

    let raw = match into_raw_request(request, core.config().envelope.max_body_bytes).await {
        Ok(raw) => raw,
        Err(err) => return err.into_response(),
    };

    match core.dispatch(permit, raw).await {
        Ok(response) => into_http_response(response),
        Err(err) => err.into_response(),
    }
}
