//! Response envelope rendering.
//!
//! Every generation response, success or failure, is a [`ResponseEnvelope`].
//! Failures carry the standard error schema under `error`; upstream bodies
//! are logged here and never rendered.

use std::any::Any;

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{ApiError, ErrorEnvelope};
use crate::orchestrator::types::{Document, PassThrough};
use crate::orchestrator::{GeneratedCv, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// External response contract. Absent members serialize as `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status: EnvelopeStatus,
    pub cv: Option<GeneratedCv>,
    pub error: Option<ErrorEnvelope>,
    pub user_or_llm_comments: Option<Document>,
    pub request_metadata: Option<Document>,
}

impl ResponseEnvelope {
    pub fn success(cv: GeneratedCv, pass_through: PassThrough) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            cv: Some(cv),
            error: None,
            user_or_llm_comments: pass_through.user_or_llm_comments,
            request_metadata: pass_through.request_metadata,
        }
    }

    pub fn failure(error: ErrorEnvelope, pass_through: Option<PassThrough>) -> Self {
        let pass_through = pass_through.unwrap_or_default();
        Self {
            status: EnvelopeStatus::Error,
            cv: None,
            error: Some(error),
            user_or_llm_comments: pass_through.user_or_llm_comments,
            request_metadata: pass_through.request_metadata,
        }
    }
}

/// Marker extension on responses produced by the panic handler.
#[derive(Debug, Clone, Copy)]
pub struct UnhandledFailure;

/// Render a pipeline outcome. `success_status` differs per entry point.
pub fn render_outcome(outcome: Outcome, success_status: StatusCode, correlation_id: &str) -> Response {
    match outcome.result {
        Ok(cv) => {
            let envelope = ResponseEnvelope::success(cv, outcome.pass_through.unwrap_or_default());
            (success_status, Json(envelope)).into_response()
        }
        Err(err) => render_error(&err, outcome.pass_through, correlation_id),
    }
}

/// Render an error with no pass-through members.
pub fn error_response(err: &ApiError, correlation_id: &str) -> Response {
    render_error(err, None, correlation_id)
}

fn render_error(err: &ApiError, pass_through: Option<PassThrough>, correlation_id: &str) -> Response {
    let status = err.status();
    log_error(err, status, correlation_id);

    let envelope = ResponseEnvelope::failure(err.to_envelope(correlation_id), pass_through);
    (status, Json(envelope)).into_response()
}

fn log_error(err: &ApiError, status: StatusCode, correlation_id: &str) {
    let audit_body = err.audit_body().unwrap_or("");
    if status.is_server_error() {
        tracing::error!(
            correlation_id,
            status = status.as_u16(),
            code = err.code(),
            error = %err,
            upstream_body = audit_body,
            "Request failed"
        );
    } else {
        tracing::warn!(
            correlation_id,
            status = status.as_u16(),
            code = err.code(),
            error = %err,
            "Request rejected"
        );
    }
}

/// Panic handler for `CatchPanicLayer`. The correlation middleware replaces
/// the marked response with a full error envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = detail, "Unhandled failure in handler");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(UnhandledFailure);
    response
}
