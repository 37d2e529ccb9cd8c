//! Route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode, Uri},
    response::Response,
    Extension, Json,
};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::error::{ApiError, SubError};
use crate::http::request::RequestContext;
use crate::http::response::{error_response, render_outcome};
use crate::observability::metrics;
use crate::orchestrator::Orchestrator;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<ServiceConfig>,
}

/// The two entry points into the same pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/v1/cv-generations`
    CvGenerations,
    /// `POST /v1/orchestrator/generate-cv`, deprecated.
    LegacyGenerateCv,
}

impl Endpoint {
    pub fn success_status(&self) -> StatusCode {
        match self {
            Endpoint::CvGenerations => StatusCode::CREATED,
            Endpoint::LegacyGenerateCv => StatusCode::OK,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::CvGenerations => "cv_generations",
            Endpoint::LegacyGenerateCv => "legacy_generate_cv",
        }
    }
}

pub async fn create_cv_generation(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    generate(state, ctx, body, Endpoint::CvGenerations).await
}

pub async fn legacy_generate_cv(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    tracing::debug!(correlation_id = %ctx.correlation_id, "Deprecated endpoint called");
    generate(state, ctx, body, Endpoint::LegacyGenerateCv).await
}

async fn generate(
    state: AppState,
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
    endpoint: Endpoint,
) -> Response {
    let start = Instant::now();

    let response = match body {
        Ok(bytes) => {
            let outcome = state.orchestrator.generate(&bytes, &ctx.correlation_id).await;
            render_outcome(outcome, endpoint.success_status(), &ctx.correlation_id)
        }
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            error_response(&ApiError::PayloadTooLarge, &ctx.correlation_id)
        }
        Err(rejection) => {
            let err = ApiError::Validation(vec![SubError::new("body", "body_unreadable", rejection.body_text())]);
            error_response(&err, &ctx.correlation_id)
        }
    };

    metrics::record_request(endpoint.label(), response.status().as_u16(), start);
    tracing::info!(
        correlation_id = %ctx.correlation_id,
        endpoint = endpoint.label(),
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Generation request finished"
    );
    response
}

/// Liveness payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub environment: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        service: state.config.service.name.clone(),
        environment: state.config.service.environment.clone(),
    })
}

pub async fn route_not_found(Extension(ctx): Extension<RequestContext>, uri: Uri) -> Response {
    error_response(&ApiError::RouteNotFound(uri.path().to_string()), &ctx.correlation_id)
}

pub async fn method_not_allowed(Extension(ctx): Extension<RequestContext>, method: Method, uri: Uri) -> Response {
    let err = ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    };
    error_response(&err, &ctx.correlation_id)
}
