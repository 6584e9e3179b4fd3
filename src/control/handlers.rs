use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{BridgeCore, BridgeStatus};
use crate::correlation::SubmitError;
use crate::dispatch::DispatchError;
use crate::event::{Event, Response};

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub wait_ms: Option<u64>,
    pub max: Option<usize>,
}

pub async fn get_status(State(core): State<Arc<BridgeCore>>) -> Json<BridgeStatus> {
    Json(core.status())
}

pub async fn get_events(
    State(core): State<Arc<BridgeCore>>,
    Query(params): Query<FetchParams>,
) -> axum::response::Response {
    let wait = params.wait_ms.map(Duration::from_millis);
    match core.fetch_events(wait, params.max).await {
        Ok(events) => {
            let batch: Vec<&Event> = events.iter().map(AsRef::as_ref).collect();
            Json(batch).into_response()
        }
        Err(err) => {
            let status = match err {
                DispatchError::WrongMode { .. } => StatusCode::CONFLICT,
                DispatchError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
                DispatchError::NoHandler { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, err.to_string())
        }
    }
}

pub async fn post_response(State(core): State<Arc<BridgeCore>>, body: Bytes) -> axum::response::Response {
    let response: Response = match serde_json::from_slice(&body) {
        Ok(response) => response,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, format!("malformed response: {}", err)),
    };

    match core.submit(response) {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(err @ SubmitError::UnknownRequestId(_)) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        Err(err @ SubmitError::Malformed(_)) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BridgeConfig, DispatchMode};
    use crate::control::control_router;
    use crate::routing::HandlerRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn core(mode: DispatchMode) -> Arc<BridgeCore> {
        let mut config = BridgeConfig::default();
        config.dispatch.mode = mode;
        Arc::new(BridgeCore::new(config, HandlerRegistry::new()))
    }

    async fn call(core: Arc<BridgeCore>, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = control_router(core).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn status_reports_snapshot() {
        let request = Request::get("/control/status").body(Body::empty()).unwrap();
        let (status, json) = call(core(DispatchMode::Poll), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "poll");
        assert_eq!(json["concurrency"], "0/1000");
        assert_eq!(json["running"], true);
    }

    #[tokio::test]
    async fn events_require_poll_mode() {
        let request = Request::get("/control/events?wait_ms=0").body(Body::empty()).unwrap();
        let (status, _) = call(core(DispatchMode::Callback), request).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn empty_poll_returns_empty_array() {
        let request = Request::get("/control/events?wait_ms=10&max=5").body(Body::empty()).unwrap();
        let (status, json) = call(core(DispatchMode::Poll), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_and_malformed_submissions() {
        let unknown = Request::post("/control/responses")
            .body(Body::from(r#"{"request_id":"0-0","status":200}"#))
            .unwrap();
        let (status, json) = call(core(DispatchMode::Poll), unknown).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("0-0"));

        let garbage = Request::post("/control/responses").body(Body::from("not json")).unwrap();
        let (status, _) = call(core(DispatchMode::Poll), garbage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
