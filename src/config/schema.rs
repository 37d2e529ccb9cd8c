//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the orchestrator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the orchestrator service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity reported by the health endpoints.
    pub service: ServiceInfoConfig,

    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Data service (hydration source) settings.
    pub data_api: DataApiConfig,

    /// Generation service settings.
    pub generation_api: GenerationApiConfig,

    /// Retry configuration shared by all upstream calls.
    pub retries: RetryConfig,

    /// Pipeline-level deadlines.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Feature flags.
    pub features: FeatureConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceInfoConfig {
    /// Service name (e.g., "eport_orchestrator_api").
    pub name: String,

    /// Deployment environment (e.g., "local", "staging", "prod").
    pub environment: String,
}

impl Default for ServiceInfoConfig {
    fn default() -> Self {
        Self {
            name: "eport_orchestrator_api".to_string(),
            environment: "local".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Data service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataApiConfig {
    /// Base URL, e.g. "http://data-api:8000". Required.
    pub base_url: Option<String>,

    /// Endpoint path templates.
    pub endpoints: DataEndpoints,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            endpoints: DataEndpoints::default(),
            timeout_secs: 15,
        }
    }
}

impl DataApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Path templates for the data service. `{placeholder}` segments are
/// substituted with the percent-encoded identifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataEndpoints {
    pub student_full_profile: String,
    pub template_info: String,
    pub role_taxonomy: String,
    pub jd_taxonomy: String,
}

impl Default for DataEndpoints {
    fn default() -> Self {
        Self {
            student_full_profile: "/v1/students/{student_id}/full-profile".to_string(),
            template_info: "/v1/templates/{template_id}".to_string(),
            role_taxonomy: "/v1/roles/{role_id}".to_string(),
            jd_taxonomy: "/v1/jds/{jd_id}".to_string(),
        }
    }
}

/// Generation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationApiConfig {
    /// Base URL, e.g. "http://generation:8000". Required.
    pub base_url: Option<String>,

    /// Path of the single generation operation.
    pub generate_path: String,

    /// Per-call timeout in seconds. Must exceed the data service timeout.
    pub timeout_secs: u64,
}

impl Default for GenerationApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            generate_path: "/v1/generate_cv".to_string(),
            timeout_secs: 60,
        }
    }
}

impl GenerationApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (2 => at most 3 attempts).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Pipeline deadlines.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for the whole hydration fan-out. Must outlast one
    /// fetch's full retry sequence.
    pub hydration_budget_secs: u64,

    /// Overall request deadline (hydration + build + generation). Must
    /// outlast the hydration budget plus the generation retry sequence.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            hydration_budget_secs: 50,
            request_secs: 240,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Forward `user_or_llm_comments` to the generation service.
    pub enable_user_or_llm_comments: bool,
}
