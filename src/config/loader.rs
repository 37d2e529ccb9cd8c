//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "EPORT_ORCH_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment override {name}: {message}")]
    Env { name: String, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then
/// `EPORT_ORCH_*` environment variables. The merged result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`. `lookup` receives the full
/// variable name (prefix included).
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        let name = format!("{ENV_PREFIX}{suffix}");
        lookup(&name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| (name, v))
    };

    if let Some((_, v)) = var("SERVICE_NAME") {
        config.service.name = v;
    }
    if let Some((_, v)) = var("ENVIRONMENT") {
        config.service.environment = v;
    }
    if let Some((_, v)) = var("LOG_LEVEL") {
        config.observability.log_level = v.to_lowercase();
    }
    if let Some((name, v)) = var("LOG_FORMAT") {
        config.observability.log_format = match v.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => {
                return Err(ConfigError::Env {
                    name,
                    message: "expected 'pretty' or 'json'".into(),
                })
            }
        };
    }
    if let Some((_, v)) = var("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some((_, v)) = var("DATA_API_BASE_URL") {
        config.data_api.base_url = Some(v);
    }
    if let Some((_, v)) = var("GENERATION_API_BASE_URL") {
        config.generation_api.base_url = Some(v);
    }
    if let Some((name, v)) = var("HTTP_TIMEOUT_SECONDS") {
        config.data_api.timeout_secs = parse_env(&name, &v)?;
    }
    if let Some((name, v)) = var("GENERATION_TIMEOUT_SECONDS") {
        config.generation_api.timeout_secs = parse_env(&name, &v)?;
    }
    if let Some((name, v)) = var("HYDRATION_BUDGET_SECONDS") {
        config.timeouts.hydration_budget_secs = parse_env(&name, &v)?;
    }
    if let Some((name, v)) = var("REQUEST_DEADLINE_SECONDS") {
        config.timeouts.request_secs = parse_env(&name, &v)?;
    }
    if let Some((name, v)) = var("MAX_RETRIES") {
        config.retries.max_retries = parse_env(&name, &v)?;
    }
    if let Some((name, v)) = var("ENABLE_USER_OR_LLM_COMMENTS") {
        config.features.enable_user_or_llm_comments = parse_bool(&name, &v)?;
    }
    if let Some((name, v)) = var("METRICS_ENABLED") {
        config.observability.metrics_enabled = parse_bool(&name, &v)?;
    }
    if let Some((_, v)) = var("METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }

    Ok(())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Env {
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            name: name.to_string(),
            message: format!("'{value}' is not a boolean"),
        }),
    }
}
