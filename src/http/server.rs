//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the generation, health and fallback routes
//!   (unknown paths and unsupported methods both render the error envelope)
//! - Wire up middleware (tracing, correlation context, panic capture, body limit)
//! - Serve on a listener until the shutdown signal fires

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers::{self, AppState};
use crate::http::request::correlation_context;
use crate::http::response::panic_response;
use crate::orchestrator::Orchestrator;
use crate::upstream::UpstreamError;

pub const CV_GENERATIONS_PATH: &str = "/api/v1/cv-generations";
pub const LEGACY_GENERATE_CV_PATH: &str = "/v1/orchestrator/generate-cv";

/// HTTP server for the orchestrator.
pub struct HttpServer {
    router: Router,
    config: Arc<ServiceConfig>,
}

impl HttpServer {
    /// Create a server whose upstream clients come from `config`.
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        let orchestrator = Orchestrator::from_config(&config)?;
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Create a server around an already-built orchestrator.
    pub fn with_orchestrator(config: ServiceConfig, orchestrator: Orchestrator) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            config: config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route(CV_GENERATIONS_PATH, post(handlers::create_cv_generation))
            .route(LEGACY_GENERATE_CV_PATH, post(handlers::legacy_generate_cv))
            .route("/health", get(handlers::health))
            .route("/healthz", get(handlers::health))
            .fallback(handlers::route_not_found)
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn(correlation_context))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            environment = %self.config.service.environment,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::stage0::Stage0Payload;
    use crate::orchestrator::types::Document;
    use crate::upstream::{DataApi, Entity, GenerationApi};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use futures_util::future::BoxFuture;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct EchoData;

    impl DataApi for EchoData {
        fn fetch<'a>(
            &'a self,
            entity: Entity,
            id: &'a str,
            _correlation_id: &'a str,
        ) -> BoxFuture<'a, Result<Document, UpstreamError>> {
            let mut doc = Document::new();
            doc.insert(entity.field().to_string(), Value::String(id.to_string()));
            if entity == Entity::Role {
                doc.insert("role_required_skills".into(), json!(["Python"]));
            }
            if id == "U-MISSING" {
                return Box::pin(async { Err(UpstreamError::NotFound) });
            }
            Box::pin(async move { Ok(doc) })
        }
    }

    struct FixedGeneration;

    impl GenerationApi for FixedGeneration {
        fn generate<'a>(
            &'a self,
            payload: &'a Stage0Payload,
            _correlation_id: &'a str,
        ) -> BoxFuture<'a, Result<Document, UpstreamError>> {
            if payload.user_id == "U-PANIC" {
                panic!("generation fake exploded");
            }
            let mut doc = Document::new();
            doc.insert("job_id".into(), json!("JOB_42"));
            doc.insert("sections".into(), json!({"skills": {"text": "Rust"}}));
            Box::pin(async move { Ok(doc) })
        }
    }

    fn router() -> Router {
        let config = ServiceConfig::default();
        let orchestrator = Orchestrator::new(&config, Arc::new(EchoData), Arc::new(FixedGeneration));
        HttpServer::with_orchestrator(config, orchestrator).router()
    }

    fn post_json(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "student_id": "U-1001",
            "template_id": "T_EMPLOYER_STD_V3",
            "role_id": "role#ai_engineer",
            "request_metadata": {"channel": "web"}
        })
    }

    #[tokio::test]
    async fn test_canonical_and_legacy_differ_only_in_status() {
        let canonical = router()
            .oneshot(post_json(CV_GENERATIONS_PATH, valid_body()))
            .await
            .unwrap();
        let legacy = router()
            .oneshot(post_json(LEGACY_GENERATE_CV_PATH, valid_body()))
            .await
            .unwrap();

        assert_eq!(canonical.status(), StatusCode::CREATED);
        assert_eq!(legacy.status(), StatusCode::OK);
        assert!(legacy.headers().contains_key("x-correlation-id"));
        assert_eq!(legacy.headers()["x-api-version"], "1");

        let canonical = body_json(canonical).await;
        let legacy = body_json(legacy).await;
        assert_eq!(canonical, legacy);
        assert_eq!(canonical["status"], "success");
        assert_eq!(canonical["cv"]["jobId"], "JOB_42");
        assert_eq!(canonical["requestMetadata"]["channel"], "web");
    }

    #[tokio::test]
    async fn test_correlation_id_echoed_on_errors() {
        let request = Request::builder()
            .method("POST")
            .uri(CV_GENERATIONS_PATH)
            .header("X-Correlation-Id", "client-corr-1")
            .body(Body::from("{}"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-correlation-id"], "client-corr-1");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"]["correlationId"], "client-corr-1");
    }

    #[tokio::test]
    async fn test_unsupported_api_version_rejected_first() {
        let request = Request::builder()
            .method("POST")
            .uri(LEGACY_GENERATE_CV_PATH)
            .header("X-API-Version", "2")
            .body(Body::from("not even json"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-api-version"], "1");
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["cv"].is_null());
        assert_eq!(body["error"]["code"], "INVALID_FIELD_VALUE");
        assert_eq!(body["error"]["subErrors"][0]["field"], "X-API-Version");
        assert_eq!(body["error"]["subErrors"][0]["errors"][0]["code"], "isIn");
    }

    #[tokio::test]
    async fn test_missing_student_is_404() {
        let mut body = valid_body();
        body["student_id"] = json!("U-MISSING");
        let response = router().oneshot(post_json(CV_GENERATIONS_PATH, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
        assert_eq!(body["error"]["subErrors"][0]["field"], "student_id");
        assert_eq!(body["requestMetadata"]["channel"], "web");
    }

    #[tokio::test]
    async fn test_panic_rendered_as_internal_error_with_headers() {
        let mut body = valid_body();
        body["student_id"] = json!("U-PANIC");
        let request = Request::builder()
            .method("POST")
            .uri(CV_GENERATIONS_PATH)
            .header("X-Correlation-Id", "corr-panic")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-correlation-id"], "corr-panic");
        assert_eq!(response.headers()["x-api-version"], "1");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["error"]["message"], "Unexpected error while processing request.");
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let response = router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({"status": "ok", "service": "eport_orchestrator_api", "environment": "local"}));

        let response = router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-correlation-id"));
        assert_eq!(body_json(response).await["error"]["code"], "RESOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_wrong_method_gets_error_envelope() {
        let request = Request::builder()
            .method("GET")
            .uri(CV_GENERATIONS_PATH)
            .header("X-Correlation-Id", "corr-method")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["x-correlation-id"], "corr-method");
        assert_eq!(response.headers()["x-api-version"], "1");
        let body = body_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
        assert_eq!(body["error"]["correlationId"], "corr-method");
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let mut config = ServiceConfig::default();
        config.listener.max_body_bytes = 64;
        let orchestrator = Orchestrator::new(&config, Arc::new(EchoData), Arc::new(FixedGeneration));
        let router = HttpServer::with_orchestrator(config, orchestrator).router();

        let response = router
            .oneshot(post_json(CV_GENERATIONS_PATH, json!({"student_id": "x".repeat(200)})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
    }
}
