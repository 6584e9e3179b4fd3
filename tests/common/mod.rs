//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use event_bridge::config::{BridgeConfig, DispatchMode};
use event_bridge::{BoundAddrs, Bridge};

/// Config bound to ephemeral loopback ports with short timeouts.
pub fn test_config(mode: DispatchMode) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.control.enabled = true;
    config.control.bind_address = "127.0.0.1:0".into();
    config.dispatch.mode = mode;
    config.admission.capacity = 64;
    config.admission.acquire_timeout_ms = 200;
    config.timeouts.response_secs = 2;
    config.timeouts.shutdown_grace_secs = 1;
    config
}

pub async fn start(bridge: &Bridge) -> BoundAddrs {
    bridge.start().await.expect("bridge failed to start")
}

/// Client without connection pooling, so stopped listeners are noticed.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}

pub fn control_url(addrs: &BoundAddrs) -> String {
    format!("http://{}", addrs.control.expect("control listener disabled"))
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
