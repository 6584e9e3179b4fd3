//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and timeouts > 0, addresses parse)
//! - Detect conflicting listeners
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::BridgeConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("control listener cannot share the intake address {0}")]
    ListenerConflict(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let intake = parse_addr("listener.bind_address", &config.listener.bind_address, &mut errors);

    if config.admission.capacity == 0 {
        errors.push(ValidationError::MustBePositive("admission.capacity"));
    }
    if config.admission.acquire_timeout_ms == 0 {
        errors.push(ValidationError::MustBePositive("admission.acquire_timeout_ms"));
    }
    if config.timeouts.response_secs == 0 {
        errors.push(ValidationError::MustBePositive("timeouts.response_secs"));
    }
    if config.envelope.max_body_bytes == 0 {
        errors.push(ValidationError::MustBePositive("envelope.max_body_bytes"));
    }
    if config.dispatch.push_capacity == 0 {
        errors.push(ValidationError::MustBePositive("dispatch.push_capacity"));
    }
    if config.dispatch.poll_batch_size == 0 {
        errors.push(ValidationError::MustBePositive("dispatch.poll_batch_size"));
    }

    if config.control.enabled {
        let control = parse_addr("control.bind_address", &config.control.bind_address, &mut errors);
        if let (Some(intake), Some(control)) = (intake, control) {
            if intake == control && intake.port() != 0 {
                errors.push(ValidationError::ListenerConflict(intake.to_string()));
            }
        }
    }

    if config.observability.metrics_enabled {
        parse_addr(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_addr(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}
