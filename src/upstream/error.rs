//! Upstream call failures and their classification.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::retries::is_retryable_status;

/// Longest upstream body excerpt kept for logs.
const MAX_BODY_EXCERPT: usize = 2048;

/// Errors from a single call to the data or generation service.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The attempt did not complete before its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The service answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The requested object does not exist.
    #[error("resource not found")]
    NotFound,

    /// The response body could not be interpreted.
    #[error("invalid upstream response: {0}")]
    Decode(String),

    /// Request could not be constructed (bad URL, unserializable payload).
    #[error("invalid upstream request: {0}")]
    Request(String),
}

impl UpstreamError {
    /// Build a status error, truncating the body to a log-safe excerpt.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_BODY_EXCERPT {
            let mut cut = MAX_BODY_EXCERPT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        UpstreamError::Status { status, body }
    }

    /// Timeouts, connection failures and 5xx responses may be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) | UpstreamError::Connect(_) => true,
            UpstreamError::Status { status, .. } => is_retryable_status(*status),
            UpstreamError::NotFound | UpstreamError::Decode(_) | UpstreamError::Request(_) => false,
        }
    }

    /// Raw body preserved for audit logging, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Short outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Connect(_) => "connect_error",
            UpstreamError::Status { status, .. } if *status >= 500 => "server_error",
            UpstreamError::Status { .. } => "client_error",
            UpstreamError::NotFound => "not_found",
            UpstreamError::Decode(_) => "decode_error",
            UpstreamError::Request(_) => "request_error",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(Duration::ZERO)
        } else if err.is_connect() || err.is_request() {
            UpstreamError::Connect(err.to_string())
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else if err.is_builder() {
            UpstreamError::Request(err.to_string())
        } else {
            UpstreamError::Connect(err.to_string())
        }
    }
}
