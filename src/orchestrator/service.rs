//! The generation pipeline.
//!
//! # Data Flow
//! ```text
//! raw body
//!     → normalizer (shape, aliases, aggregated field errors)
//!     → stage0::precheck (request-only rules)
//!     → Hydrator (parallel fetches, hydration budget)
//!     → stage0::build (cross-field rules, payload)
//!     → GenerationInvoker (retries, per-attempt timeout)
//!     → GeneratedCv
//! ```
//!
//! Everything after normalization runs under the overall request deadline.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::orchestrator::cv::GeneratedCv;
use crate::orchestrator::normalizer;
use crate::orchestrator::stage0;
use crate::orchestrator::types::{NormalizedRequest, PassThrough};
use crate::upstream::{DataApi, GenerationApi, GenerationInvoker, HttpDataApi, HttpGenerationApi, Hydrator, UpstreamError};

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Outcome {
    /// Client pass-through objects; `None` when the body never normalized.
    pub pass_through: Option<PassThrough>,
    pub result: Result<GeneratedCv, ApiError>,
}

/// Stateless orchestrator shared by every request.
#[derive(Clone)]
pub struct Orchestrator {
    hydrator: Hydrator,
    invoker: GenerationInvoker,
    include_comments: bool,
    request_deadline: Duration,
}

impl Orchestrator {
    pub fn new(config: &ServiceConfig, data_api: Arc<dyn DataApi>, generation_api: Arc<dyn GenerationApi>) -> Self {
        Self {
            hydrator: Hydrator::new(
                data_api,
                &config.retries,
                config.data_api.timeout(),
                Duration::from_secs(config.timeouts.hydration_budget_secs),
            ),
            invoker: GenerationInvoker::new(generation_api, &config.retries, config.generation_api.timeout()),
            include_comments: config.features.enable_user_or_llm_comments,
            request_deadline: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    /// Build the HTTP clients described by `config`. One connection pool is
    /// shared by both services.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("cv-orchestrator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let data_api = HttpDataApi::new(client.clone(), &config.data_api)?;
        let generation_api = HttpGenerationApi::new(client, &config.generation_api)?;

        Ok(Self::new(config, Arc::new(data_api), Arc::new(generation_api)))
    }

    /// Run the full pipeline for one raw request body.
    pub async fn generate(&self, body: &[u8], correlation_id: &str) -> Outcome {
        let req = match normalizer::normalize_body(body) {
            Ok(req) => req,
            Err(err) => {
                tracing::info!(correlation_id, error = %err, "Request rejected during normalization");
                return Outcome {
                    pass_through: None,
                    result: Err(err),
                };
            }
        };

        tracing::info!(
            correlation_id,
            student_id = %req.student_id,
            template_id = %req.template_id,
            language = %req.language,
            has_role = req.role_id.is_some(),
            has_jd = req.jd_id.is_some(),
            "Generation request accepted"
        );

        let result = self.run(&req, correlation_id).await;
        Outcome {
            pass_through: Some(req.pass_through),
            result,
        }
    }

    async fn run(&self, req: &NormalizedRequest, correlation_id: &str) -> Result<GeneratedCv, ApiError> {
        stage0::precheck(req)?;

        let pipeline = async {
            let data = self.hydrator.hydrate(req, correlation_id).await?;
            let payload = stage0::build(req, &data, self.include_comments)?;
            let raw = self.invoker.invoke(&payload, correlation_id).await?;
            Ok::<_, ApiError>(GeneratedCv::from_result(raw, req))
        };

        match tokio::time::timeout(self.request_deadline, pipeline).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    correlation_id,
                    deadline = ?self.request_deadline,
                    "Request deadline exceeded"
                );
                Err(ApiError::DeadlineExceeded(self.request_deadline.as_secs()))
            }
        }
    }
}
