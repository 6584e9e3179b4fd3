//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the event bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Intake listener configuration.
    pub listener: ListenerConfig,

    /// Bounded concurrency gate.
    pub admission: AdmissionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Event envelope limits.
    pub envelope: EnvelopeConfig,

    /// Hand-off strategy selection and tuning.
    pub dispatch: DispatchConfig,

    /// Control listener for out-of-process workers.
    pub control: ControlConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Port 0 binds an ephemeral port.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Admission controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of requests admitted at the same time.
    pub capacity: usize,

    /// How long a request may wait for a free slot, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl AdmissionConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            acquire_timeout_ms: 5000,
        }
    }
}

/// Timeout configuration for the waiting points of a request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a handed-off request waits for its response, in seconds.
    pub response_secs: u64,

    /// How long `stop` lets in-flight requests finish, in seconds.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            response_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Event envelope configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Request bodies longer than this are truncated and flagged with `more_body`.
    pub max_body_bytes: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

/// Which hand-off strategy the bridge runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Registered handlers are invoked directly.
    #[default]
    Callback,
    /// Events go into a bounded buffer drained by a consumer.
    Push,
    /// Events accumulate until workers fetch them in batches.
    Poll,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Callback => "callback",
            DispatchMode::Push => "push",
            DispatchMode::Poll => "poll",
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "callback" => Ok(DispatchMode::Callback),
            "push" => Ok(DispatchMode::Push),
            "poll" => Ok(DispatchMode::Poll),
            other => Err(format!("unknown dispatch mode '{}'", other)),
        }
    }
}

/// Hand-off strategy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Active strategy.
    pub mode: DispatchMode,

    /// Push queue capacity before the oldest event is evicted.
    pub push_capacity: usize,

    /// Maximum events returned by a single poll.
    pub poll_batch_size: usize,

    /// Default time a poll blocks waiting for events, in seconds.
    pub poll_wait_secs: u64,
}

impl DispatchConfig {
    pub fn poll_wait(&self) -> Duration {
        Duration::from_secs(self.poll_wait_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Callback,
            push_capacity: 10_000,
            poll_batch_size: 10,
            poll_wait_secs: 30,
        }
    }
}

/// Control listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Serve the control API.
    pub enabled: bool,

    /// Control listener bind address.
    pub bind_address: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = BridgeConfig::default();
        assert_eq!(config.admission.capacity, 1000);
        assert_eq!(config.timeouts.response(), Duration::from_secs(30));
        assert_eq!(config.envelope.max_body_bytes, 1024 * 1024);
        assert_eq!(config.dispatch.mode, DispatchMode::Callback);
        assert_eq!(config.dispatch.push_capacity, 10_000);
        assert_eq!(config.dispatch.poll_batch_size, 10);
        assert!(!config.control.enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [dispatch]
            mode = "poll"

            [admission]
            capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatch.mode, DispatchMode::Poll);
        assert_eq!(config.dispatch.poll_batch_size, 10);
        assert_eq!(config.admission.capacity, 8);
        assert_eq!(config.admission.acquire_timeout_ms, 5000);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn dispatch_mode_from_str() {
        assert_eq!("PUSH".parse::<DispatchMode>().unwrap(), DispatchMode::Push);
        assert!("carrier-pigeon".parse::<DispatchMode>().is_err());
    }
}
