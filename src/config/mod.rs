//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → copied into each running instance at start()
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new config takes effect on the next start()
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::{
    AdmissionConfig, BridgeConfig, ControlConfig, DispatchConfig, DispatchMode,
    EnvelopeConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig,
};
