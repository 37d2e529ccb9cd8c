//! Generation service invocation.
//!
//! One atomic call per request. Transient failures (timeout, connect, 5xx)
//! are retried under the shared policy with the generation timeout per
//! attempt; a 4xx rejection is final on the first attempt.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::{GenerationApiConfig, RetryConfig};
use crate::error::ApiError;
use crate::http::request::CORRELATION_HEADER;
use crate::orchestrator::stage0::Stage0Payload;
use crate::orchestrator::types::Document;
use crate::resilience::retries::is_retryable_status;
use crate::resilience::{RetryFailure, RetryPolicy};
use crate::upstream::error::UpstreamError;

/// The generation service's single operation.
pub trait GenerationApi: Send + Sync {
    fn generate<'a>(
        &'a self,
        payload: &'a Stage0Payload,
        correlation_id: &'a str,
    ) -> BoxFuture<'a, Result<Document, UpstreamError>>;
}

/// `reqwest` implementation of [`GenerationApi`].
#[derive(Clone)]
pub struct HttpGenerationApi {
    client: Client,
    url: Url,
}

impl HttpGenerationApi {
    pub fn new(client: Client, config: &GenerationApiConfig) -> Result<Self, UpstreamError> {
        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| UpstreamError::Request("generation service base URL is not configured".into()))?;
        let url = Url::parse(base)
            .and_then(|base| base.join(&config.generate_path))
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post(&self, payload: &Stage0Payload, correlation_id: &str) -> Result<Document, UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CORRELATION_HEADER, correlation_id)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(status.as_u16(), body));
        }

        match response.json::<Value>().await? {
            Value::Object(obj) => Ok(obj),
            _ => Err(UpstreamError::Decode("generation result is not a JSON object".into())),
        }
    }
}

impl GenerationApi for HttpGenerationApi {
    fn generate<'a>(
        &'a self,
        payload: &'a Stage0Payload,
        correlation_id: &'a str,
    ) -> BoxFuture<'a, Result<Document, UpstreamError>> {
        Box::pin(self.post(payload, correlation_id))
    }
}

/// Calls the generation service and translates failures into [`ApiError`].
#[derive(Clone)]
pub struct GenerationInvoker {
    api: Arc<dyn GenerationApi>,
    policy: RetryPolicy,
}

impl GenerationInvoker {
    pub fn new(api: Arc<dyn GenerationApi>, retries: &RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            api,
            policy: RetryPolicy::new(retries, attempt_timeout),
        }
    }

    pub async fn invoke(&self, payload: &Stage0Payload, correlation_id: &str) -> Result<Document, ApiError> {
        tracing::info!(
            correlation_id,
            max_attempts = self.policy.max_attempts(),
            timeout = ?self.policy.attempt_timeout(),
            "Calling generation service"
        );

        self.policy
            .run("generation_api", |_| self.api.generate(payload, correlation_id))
            .await
            .map_err(|failure| translate_failure(failure, correlation_id))
    }
}

fn translate_failure(failure: RetryFailure, correlation_id: &str) -> ApiError {
    let RetryFailure { attempts, last_error } = failure;
    let body = last_error.body().map(str::to_string);

    tracing::error!(
        correlation_id,
        attempts,
        error = %last_error,
        upstream_body = body.as_deref().unwrap_or(""),
        "Generation service call failed"
    );

    match last_error {
        UpstreamError::Status { status, body } if !is_retryable_status(status) => ApiError::GenerationRejected {
            status,
            code: downstream_code(&body),
            body,
        },
        err if err.is_transient() => ApiError::GenerationExhausted {
            attempts,
            code: body.as_deref().and_then(downstream_code),
            last_error: err.to_string(),
            body,
        },
        err => ApiError::Internal(format!("generation service: {err}")),
    }
}

/// Error code carried by a downstream error body, if any. Accepts `code`,
/// `error.code` and `detail.code`.
pub fn downstream_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.get("code"),
        value.get("error").and_then(|e| e.get("code")),
        value.get("detail").and_then(|d| d.get("code")),
    ];
    let code = candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string);
    code
}
