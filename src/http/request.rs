//! Per-request header context.
//!
//! # Responsibilities
//! - Derive the correlation id (incoming `X-Correlation-Id` or a generated one)
//! - Validate `X-API-Version` before any other processing
//! - Echo both headers on every response, error and panic paths included
//!
//! The validated context travels to handlers as a [`RequestContext`]
//! request extension.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::response::{error_response, UnhandledFailure};

pub const CORRELATION_HEADER: &str = "X-Correlation-Id";
pub const API_VERSION_HEADER: &str = "X-API-Version";

/// Versions accepted in `X-API-Version`.
pub const SUPPORTED_API_VERSIONS: [&str; 1] = ["1"];

/// Effective version when the header is absent or rejected.
pub const DEFAULT_API_VERSION: &str = "1";

/// Prefix of generated correlation ids.
pub const CORRELATION_PREFIX: &str = "corr_";

/// Header-derived context attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    /// Validated version, or the default.
    pub api_version: String,
}

/// Incoming correlation id (trimmed) or a fresh `corr_<32 hex>` id.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_correlation_id)
}

pub fn generate_correlation_id() -> String {
    format!("{CORRELATION_PREFIX}{}", Uuid::new_v4().simple())
}

/// The requested API version, if supported. A blank header counts as absent.
pub fn api_version(headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(raw) = headers.get(API_VERSION_HEADER) else {
        return Ok(DEFAULT_API_VERSION.to_string());
    };

    let requested = match raw.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            return Err(ApiError::InvalidApiVersion(
                String::from_utf8_lossy(raw.as_bytes()).into_owned(),
            ))
        }
    };
    if requested.is_empty() {
        return Ok(DEFAULT_API_VERSION.to_string());
    }
    if SUPPORTED_API_VERSIONS.contains(&requested) {
        Ok(requested.to_string())
    } else {
        Err(ApiError::InvalidApiVersion(requested.to_string()))
    }
}

/// Middleware establishing the [`RequestContext`].
pub async fn correlation_context(mut req: Request, next: Next) -> Response {
    let headers = req.headers();
    let correlation_id = correlation_id(headers);
    let version = api_version(headers);

    let ctx = RequestContext {
        correlation_id,
        api_version: version.as_ref().map_or_else(|_| DEFAULT_API_VERSION.to_string(), String::clone),
    };

    let mut response = match version {
        Ok(_) => {
            req.extensions_mut().insert(ctx.clone());
            next.run(req).await
        }
        Err(err) => {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                path = %req.uri().path(),
                error = %err,
                "Rejected unsupported API version"
            );
            error_response(&err, &ctx.correlation_id)
        }
    };

    if response.extensions().get::<UnhandledFailure>().is_some() {
        tracing::error!(correlation_id = %ctx.correlation_id, "Handler panicked");
        response = error_response(&ApiError::Internal("handler panicked".into()), &ctx.correlation_id);
    }

    apply_context_headers(response.headers_mut(), &ctx);
    response
}

fn apply_context_headers(headers: &mut HeaderMap, ctx: &RequestContext) {
    let pairs = [
        (CORRELATION_HEADER, ctx.correlation_id.as_str()),
        (API_VERSION_HEADER, ctx.api_version.as_str()),
    ];
    for (name, value) in pairs {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = name, "Header value not representable, skipped"),
        }
    }
}
