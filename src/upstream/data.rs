//! Upstream data hydration.
//!
//! # Responsibilities
//! - Resolve student, template and the optional role/JD ids into documents
//! - Fan the fetches out concurrently and join them before Stage-0 runs
//! - Attribute every failure to the entity that caused it
//!
//! Each fetch runs under the shared retry policy with the data service
//! timeout per attempt. The whole fan-out is bounded by the hydration budget;
//! a fetch still pending when the budget runs out fails on its own entity.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::config::{DataApiConfig, RetryConfig};
use crate::error::{ApiError, SubErrors};
use crate::http::request::CORRELATION_HEADER;
use crate::orchestrator::types::{Document, NormalizedRequest};
use crate::resilience::{RetryFailure, RetryPolicy};
use crate::upstream::error::UpstreamError;

/// Objects the data service can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Student,
    Template,
    Role,
    Jd,
}

impl Entity {
    /// Short name used in messages ("student", "jd").
    pub fn label(&self) -> &'static str {
        match self {
            Entity::Student => "student",
            Entity::Template => "template",
            Entity::Role => "role",
            Entity::Jd => "jd",
        }
    }

    /// Field that carried the id, used as the sub-error field.
    pub fn field(&self) -> &'static str {
        match self {
            Entity::Student => "student_id",
            Entity::Template => "template_id",
            Entity::Role => "role_id",
            Entity::Jd => "jd_id",
        }
    }

    fn path_template<'a>(&self, endpoints: &'a crate::config::DataEndpoints) -> &'a str {
        match self {
            Entity::Student => &endpoints.student_full_profile,
            Entity::Template => &endpoints.template_info,
            Entity::Role => &endpoints.role_taxonomy,
            Entity::Jd => &endpoints.jd_taxonomy,
        }
    }

    fn placeholder(&self) -> String {
        format!("{{{}}}", self.field())
    }

    /// Envelope key the data service sometimes wraps the object in.
    fn wrapper_key(&self) -> &'static str {
        match self {
            Entity::Student => "student_profile",
            Entity::Template => "template_info",
            Entity::Role => "role_taxonomy",
            Entity::Jd => "jd_taxonomy",
        }
    }
}

/// Read-only fetch-by-id operations of the data service.
pub trait DataApi: Send + Sync {
    fn fetch<'a>(
        &'a self,
        entity: Entity,
        id: &'a str,
        correlation_id: &'a str,
    ) -> BoxFuture<'a, Result<Document, UpstreamError>>;
}

/// `reqwest` implementation of [`DataApi`].
#[derive(Clone)]
pub struct HttpDataApi {
    client: Client,
    base_url: Url,
    endpoints: crate::config::DataEndpoints,
}

impl HttpDataApi {
    pub fn new(client: Client, config: &DataApiConfig) -> Result<Self, UpstreamError> {
        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| UpstreamError::Request("data service base URL is not configured".into()))?;
        let base_url = Url::parse(base).map_err(|e| UpstreamError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            endpoints: config.endpoints.clone(),
        })
    }

    /// Substitute `id` into the entity's path template as one encoded segment.
    pub fn url_for(&self, entity: Entity, id: &str) -> Result<Url, UpstreamError> {
        let template = entity.path_template(&self.endpoints);
        let placeholder = entity.placeholder();

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::Request("data service base URL cannot be a base".into()))?;
            segments.pop_if_empty();
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                if segment == placeholder {
                    segments.push(id);
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }

    async fn get(&self, entity: Entity, id: &str, correlation_id: &str) -> Result<Document, UpstreamError> {
        let url = self.url_for(entity, id)?;
        tracing::debug!(entity = entity.label(), %url, "Fetching from data service");

        let response = self
            .client
            .get(url)
            .header(CORRELATION_HEADER, correlation_id)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(status.as_u16(), body));
        }

        let value: Value = response.json().await?;
        unwrap_document(entity, value)
    }
}

impl DataApi for HttpDataApi {
    fn fetch<'a>(
        &'a self,
        entity: Entity,
        id: &'a str,
        correlation_id: &'a str,
    ) -> BoxFuture<'a, Result<Document, UpstreamError>> {
        Box::pin(self.get(entity, id, correlation_id))
    }
}

/// `null` means not found; `{"student_profile": {...}}` style wrappers are removed.
fn unwrap_document(entity: Entity, value: Value) -> Result<Document, UpstreamError> {
    match value {
        Value::Null => Err(UpstreamError::NotFound),
        Value::Object(mut obj) => {
            if obj.len() == 1 {
                match obj.remove(entity.wrapper_key()) {
                    Some(Value::Object(inner)) => return Ok(inner),
                    Some(Value::Null) => return Err(UpstreamError::NotFound),
                    Some(other) => {
                        obj.insert(entity.wrapper_key().to_string(), other);
                    }
                    None => {}
                }
            }
            Ok(obj)
        }
        other => Err(UpstreamError::Decode(format!(
            "expected a JSON object for {}, got {}",
            entity.label(),
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One hydrated upstream object.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedObject {
    pub id: String,
    pub attributes: Document,
}

/// Everything Stage-0 needs from the data service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamData {
    pub student_profile: HydratedObject,
    pub template_info: HydratedObject,
    /// Present iff the request carried a role id.
    pub role_taxonomy: Option<HydratedObject>,
    /// Present iff the request carried a JD id.
    pub jd_taxonomy: Option<HydratedObject>,
}

struct FetchFailure {
    entity: Entity,
    id: String,
    failure: RetryFailure,
    /// Cut off by the hydration budget rather than by its own retries.
    over_budget: bool,
}

type FetchResult = Result<HydratedObject, FetchFailure>;

/// Resolves a normalized request into [`UpstreamData`].
#[derive(Clone)]
pub struct Hydrator {
    api: Arc<dyn DataApi>,
    policy: RetryPolicy,
    budget: Duration,
}

impl Hydrator {
    pub fn new(api: Arc<dyn DataApi>, retries: &RetryConfig, attempt_timeout: Duration, budget: Duration) -> Self {
        Self {
            api,
            policy: RetryPolicy::new(retries, attempt_timeout),
            budget,
        }
    }

    pub async fn hydrate(&self, req: &NormalizedRequest, correlation_id: &str) -> Result<UpstreamData, ApiError> {
        let deadline = Instant::now() + self.budget;
        let student = self.fetch(deadline, Entity::Student, &req.student_id, correlation_id);
        let template = self.fetch(deadline, Entity::Template, &req.template_id, correlation_id);
        let role = self.fetch_optional(deadline, Entity::Role, req.role_id.as_deref(), correlation_id);
        let jd = self.fetch_optional(deadline, Entity::Jd, req.jd_id.as_deref(), correlation_id);

        let (student, template, role, jd) = tokio::join!(student, template, role, jd);

        let mut failures = Vec::new();
        let student = collect(student, &mut failures);
        let template = collect(template, &mut failures);
        let role = role.and_then(|r| collect(r, &mut failures));
        let jd = jd.and_then(|r| collect(r, &mut failures));

        if !failures.is_empty() {
            return Err(failure_error(&failures, correlation_id));
        }

        match (student, template) {
            (Some(student_profile), Some(template_info)) => {
                tracing::info!(
                    correlation_id,
                    has_role = role.is_some(),
                    has_jd = jd.is_some(),
                    "Upstream data hydrated"
                );
                Ok(UpstreamData {
                    student_profile,
                    template_info,
                    role_taxonomy: role,
                    jd_taxonomy: jd,
                })
            }
            _ => Err(ApiError::Internal("required upstream object missing without failure".into())),
        }
    }

    async fn fetch(&self, deadline: Instant, entity: Entity, id: &str, correlation_id: &str) -> FetchResult {
        let attempts = AtomicU32::new(0);
        let retried = self.policy.run("data_api", |attempt| {
            attempts.store(attempt, Ordering::Relaxed);
            self.api.fetch(entity, id, correlation_id)
        });

        let (failure, over_budget) = match tokio::time::timeout_at(deadline, retried).await {
            Ok(Ok(attributes)) => {
                return Ok(HydratedObject {
                    id: id.to_string(),
                    attributes,
                })
            }
            Ok(Err(failure)) => (failure, false),
            Err(_) => {
                let failure = RetryFailure {
                    attempts: attempts.load(Ordering::Relaxed),
                    last_error: UpstreamError::Timeout(self.budget),
                };
                (failure, true)
            }
        };

        Err(FetchFailure {
            entity,
            id: id.to_string(),
            failure,
            over_budget,
        })
    }

    async fn fetch_optional(
        &self,
        deadline: Instant,
        entity: Entity,
        id: Option<&str>,
        correlation_id: &str,
    ) -> Option<FetchResult> {
        match id {
            Some(id) => Some(self.fetch(deadline, entity, id, correlation_id).await),
            None => None,
        }
    }
}

fn collect(result: FetchResult, failures: &mut Vec<FetchFailure>) -> Option<HydratedObject> {
    match result {
        Ok(obj) => Some(obj),
        Err(failure) => {
            failures.push(failure);
            None
        }
    }
}

/// Not-found only ⇒ 404 naming each missing entity. Anything else ⇒ data
/// service error listing every failed entity.
fn failure_error(failures: &[FetchFailure], correlation_id: &str) -> ApiError {
    let all_not_found = failures
        .iter()
        .all(|f| matches!(f.failure.last_error, UpstreamError::NotFound));

    let mut errors = SubErrors::new();
    for f in failures {
        let err = &f.failure.last_error;
        tracing::warn!(
            correlation_id,
            entity = f.entity.label(),
            id = %f.id,
            attempts = f.failure.attempts,
            over_budget = f.over_budget,
            error = %err,
            upstream_body = err.body().unwrap_or(""),
            "Data service fetch failed"
        );

        if matches!(err, UpstreamError::NotFound) {
            errors.push(
                f.entity.field(),
                "not_found",
                format!("{} '{}' was not found", f.entity.label(), f.id),
            );
        } else if f.over_budget {
            errors.push(
                f.entity.field(),
                err.outcome(),
                format!(
                    "{} '{}' did not resolve within the hydration budget ({} attempt(s) started)",
                    f.entity.label(),
                    f.id,
                    f.failure.attempts,
                ),
            );
        } else {
            errors.push(
                f.entity.field(),
                err.outcome(),
                format!(
                    "{} '{}' could not be fetched after {} attempt(s): {}",
                    f.entity.label(),
                    f.id,
                    f.failure.attempts,
                    err
                ),
            );
        }
    }

    if all_not_found {
        ApiError::NotFound(errors.into_vec())
    } else {
        ApiError::DataService(errors.into_vec())
    }
}
