//! Client for the control API.

use std::time::Duration;
use thiserror::Error;

use crate::bridge::BridgeStatus;
use crate::event::{Event, Response};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("control request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// HTTP client for a bridge's control listener.
#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    http: reqwest::Client,
}

impl ControlClient {
    /// `base_url` is the control listener root, e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn status(&self) -> Result<BridgeStatus, ClientError> {
        let res = self
            .http
            .get(format!("{}/control/status", self.base_url))
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    /// Long-poll for events. An empty batch means the wait elapsed.
    pub async fn fetch_events(
        &self,
        wait: Option<Duration>,
        max: Option<usize>,
    ) -> Result<Vec<Event>, ClientError> {
        let mut params = Vec::new();
        if let Some(wait) = wait {
            params.push(format!("wait_ms={}", wait.as_millis()));
        }
        if let Some(max) = max {
            params.push(format!("max={}", max));
        }

        let mut url = format!("{}/control/events", self.base_url);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        let res = self.http.get(url).send().await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn submit(&self, response: &Response) -> Result<(), ClientError> {
        let res = self
            .http
            .post(format!("{}/control/responses", self.base_url))
            .json(response)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|json| json["error"].as_str().map(str::to_string))
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
