//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → EPORT_ORCH_* environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → shared via Arc to all components
//! ```
//!
//! # Design Decisions
//! - Config is assembled once at startup; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DataApiConfig, DataEndpoints, FeatureConfig, GenerationApiConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RetryConfig, ServiceConfig, ServiceInfoConfig, TimeoutConfig,
};
