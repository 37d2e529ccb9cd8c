//! Error taxonomy and the standard error schema.
//!
//! Every failure the service can report maps to one `ApiError` variant, which
//! fixes the HTTP status, the machine-readable code and the sub-errors shown
//! to the client. Upstream bodies are kept on the variant for logging only.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// One field-scoped problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

/// All problems reported for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubError {
    pub field: String,
    pub errors: Vec<FieldError>,
}

impl SubError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            errors: vec![FieldError {
                code: code.into(),
                message: message.into(),
            }],
        }
    }
}

/// Collects sub-errors, merging entries for the same field while keeping
/// first-seen field order.
#[derive(Debug, Default)]
pub struct SubErrors(Vec<SubError>);

impl SubErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let error = FieldError {
            code: code.into(),
            message: message.into(),
        };
        match self.0.iter_mut().find(|s| s.field == field) {
            Some(existing) => existing.errors.push(error),
            None => self.0.push(SubError {
                field,
                errors: vec![error],
            }),
        }
    }

    pub fn extend(&mut self, other: Vec<SubError>) {
        for sub in other {
            for e in sub.errors {
                self.push(sub.field.clone(), e.code, e.message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<SubError> {
        self.0
    }
}

/// Standard error schema carried in the `error` member of every failure response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub sub_errors: Vec<SubError>,
    pub timestamp: u64,
    pub correlation_id: String,
}

/// Every way a request can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request shape, enum or unknown-field violations.
    #[error("request validation failed")]
    Validation(Vec<SubError>),

    /// Unsupported `X-API-Version`.
    #[error("unsupported API version '{0}'")]
    InvalidApiVersion(String),

    /// Cross-field rule violations while assembling the Stage-0 payload.
    #[error("stage-0 payload could not be built")]
    Stage0Build(Vec<SubError>),

    /// Upstream entities that do not exist.
    #[error("upstream resources not found")]
    NotFound(Vec<SubError>),

    /// No handler for the requested path.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// Known path, unsupported HTTP method.
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    /// Data service failed for a reason other than not-found.
    #[error("data service failure")]
    DataService(Vec<SubError>),

    /// Generation service rejected the payload (4xx).
    #[error("generation service rejected the request with HTTP {status}")]
    GenerationRejected {
        status: u16,
        code: Option<String>,
        body: String,
    },

    /// Generation transient failures outlasted the retry policy.
    #[error("generation service failed after {attempts} attempts: {last_error}")]
    GenerationExhausted {
        attempts: u32,
        code: Option<String>,
        last_error: String,
        body: Option<String>,
    },

    /// The overall request deadline elapsed.
    #[error("request deadline of {0}s exceeded")]
    DeadlineExceeded(u64),

    /// Body larger than the configured limit.
    #[error("request body too large")]
    PayloadTooLarge,

    /// Unexpected local failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidApiVersion(_) | ApiError::Stage0Build(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::DataService(_) | ApiError::GenerationRejected { .. } => StatusCode::BAD_GATEWAY,
            ApiError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::GenerationExhausted { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::InvalidApiVersion(_) => "INVALID_FIELD_VALUE",
            ApiError::Stage0Build(_) => "ORCH_STAGE0_BUILD_ERROR",
            ApiError::NotFound(_) | ApiError::RouteNotFound(_) => "RESOURCE_NOT_FOUND",
            ApiError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            ApiError::DataService(_) => "ORCH_DATA_API_ERROR",
            ApiError::GenerationRejected { code, .. } => {
                code.as_deref().unwrap_or("ORCH_GENERATION_HTTP_ERROR")
            }
            ApiError::GenerationExhausted { code, .. } => {
                code.as_deref().unwrap_or("INTERNAL_SERVER_ERROR")
            }
            ApiError::DeadlineExceeded(_) => "ORCH_DEADLINE_EXCEEDED",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Client-facing message. Never contains upstream bodies.
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(_) => "Validation failed".into(),
            ApiError::InvalidApiVersion(_) => "Invalid API version".into(),
            ApiError::Stage0Build(_) => "Failed to construct Stage-0 payload for generation.".into(),
            ApiError::NotFound(subs) => {
                let entities: Vec<&str> = subs
                    .iter()
                    .map(|s| s.field.trim_end_matches("_id"))
                    .collect();
                format!("Upstream resource not found: {}", entities.join(", "))
            }
            ApiError::RouteNotFound(path) => format!("No route for {path}"),
            ApiError::MethodNotAllowed { method, path } => format!("Method {method} is not allowed on {path}"),
            ApiError::DataService(_) => "Failed to fetch required data from the data service.".into(),
            ApiError::GenerationRejected { status, .. } => {
                format!("CV generation service rejected the request (HTTP {status}).")
            }
            ApiError::GenerationExhausted { attempts, .. } => {
                format!("CV generation service unavailable after {attempts} attempts.")
            }
            ApiError::DeadlineExceeded(secs) => {
                format!("Request did not complete within {secs} seconds.")
            }
            ApiError::PayloadTooLarge => "Request body exceeds the allowed size.".into(),
            ApiError::Internal(_) => "Unexpected error while processing request.".into(),
        }
    }

    pub fn sub_errors(&self) -> Vec<SubError> {
        match self {
            ApiError::Validation(subs)
            | ApiError::Stage0Build(subs)
            | ApiError::NotFound(subs)
            | ApiError::DataService(subs) => subs.clone(),
            ApiError::InvalidApiVersion(_) => vec![SubError::new(
                crate::http::request::API_VERSION_HEADER,
                "isIn",
                format!(
                    "Supported versions: {}",
                    crate::http::request::SUPPORTED_API_VERSIONS.join(", ")
                ),
            )],
            _ => Vec::new(),
        }
    }

    /// Upstream body kept for audit logs.
    pub fn audit_body(&self) -> Option<&str> {
        match self {
            ApiError::GenerationRejected { body, .. } => Some(body),
            ApiError::GenerationExhausted { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Render the standard error schema for this error.
    pub fn to_envelope(&self, correlation_id: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code().to_string(),
            message: self.message(),
            sub_errors: self.sub_errors(),
            timestamp: unix_timestamp(),
            correlation_id: correlation_id.to_string(),
        }
    }
}

/// Seconds since the Unix epoch.
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
