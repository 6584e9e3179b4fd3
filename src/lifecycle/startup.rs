//! Listener binding at start.
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind aborts start() before any
//!   instance state is built
//! - Port 0 is allowed and the bound address is reported back

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::bridge::LifecycleError;
use crate::config::BridgeConfig;

/// Addresses the bridge is serving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundAddrs {
    pub intake: SocketAddr,
    pub control: Option<SocketAddr>,
}

/// Listeners bound for one run.
#[derive(Debug)]
pub struct BoundListeners {
    pub intake: TcpListener,
    pub control: Option<TcpListener>,
}

impl BoundListeners {
    pub fn addrs(&self) -> Result<BoundAddrs, LifecycleError> {
        Ok(BoundAddrs {
            intake: self.intake.local_addr().map_err(LifecycleError::Bind)?,
            control: self
                .control
                .as_ref()
                .map(|listener| listener.local_addr())
                .transpose()
                .map_err(LifecycleError::Bind)?,
        })
    }
}

/// Bind the intake listener and, if enabled, the control listener.
pub async fn bind_listeners(config: &BridgeConfig) -> Result<BoundListeners, LifecycleError> {
    let intake = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(LifecycleError::Bind)?;

    let control = if config.control.enabled {
        Some(
            TcpListener::bind(&config.control.bind_address)
                .await
                .map_err(LifecycleError::Bind)?,
        )
    } else {
        None
    };

    Ok(BoundListeners { intake, control })
}
