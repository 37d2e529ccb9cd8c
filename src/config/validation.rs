//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required upstream URLs present and absolute
//! - Validate value ranges (timeouts > 0, deadlines outlast retry budgets)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::config::schema::ServiceConfig;
use crate::resilience::RetryPolicy;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a merged configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_base_url(&mut errors, "data_api.base_url", config.data_api.base_url.as_deref());
    check_base_url(
        &mut errors,
        "generation_api.base_url",
        config.generation_api.base_url.as_deref(),
    );

    let endpoints = &config.data_api.endpoints;
    for (field, template, placeholder) in [
        ("data_api.endpoints.student_full_profile", &endpoints.student_full_profile, "{student_id}"),
        ("data_api.endpoints.template_info", &endpoints.template_info, "{template_id}"),
        ("data_api.endpoints.role_taxonomy", &endpoints.role_taxonomy, "{role_id}"),
        ("data_api.endpoints.jd_taxonomy", &endpoints.jd_taxonomy, "{jd_id}"),
    ] {
        if !template.split('/').any(|segment| segment == placeholder) {
            errors.push(ValidationError::new(
                field,
                format!("template must contain the path segment {placeholder}"),
            ));
        }
    }

    if !config.generation_api.generate_path.starts_with('/') {
        errors.push(ValidationError::new("generation_api.generate_path", "must start with '/'"));
    }

    if config.data_api.timeout_secs == 0 {
        errors.push(ValidationError::new("data_api.timeout_secs", "must be greater than 0"));
    }
    if config.generation_api.timeout_secs <= config.data_api.timeout_secs {
        errors.push(ValidationError::new(
            "generation_api.timeout_secs",
            "must be greater than data_api.timeout_secs",
        ));
    }

    let hydration_budget = Duration::from_secs(config.timeouts.hydration_budget_secs);
    let data_worst = RetryPolicy::new(&config.retries, config.data_api.timeout()).worst_case();
    if hydration_budget <= data_worst {
        errors.push(ValidationError::new(
            "timeouts.hydration_budget_secs",
            format!("must exceed the data service retry budget ({data_worst:?})"),
        ));
    }
    let generation_worst = RetryPolicy::new(&config.retries, config.generation_api.timeout()).worst_case();
    if Duration::from_secs(config.timeouts.request_secs) <= hydration_budget + generation_worst {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed timeouts.hydration_budget_secs plus the generation retry budget ({generation_worst:?})"
            ),
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a valid socket address"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>) {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => errors.push(ValidationError::new(field, "is required")),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => errors.push(ValidationError::new(field, "must be an http(s) URL with a host")),
            Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
        },
    }
}
