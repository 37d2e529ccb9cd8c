//! Shared utilities for end-to-end tests.
//!
//! Each test gets its own pair of `wiremock` servers standing in for the
//! data and generation services, plus a real orchestrator listening on an
//! ephemeral local port.

#![allow(dead_code)]

use std::time::Duration;

use cv_orchestrator::config::ServiceConfig;
use cv_orchestrator::lifecycle::Shutdown;
use cv_orchestrator::HttpServer;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const STUDENT_ID: &str = "U-1001";
pub const TEMPLATE_ID: &str = "T_EMPLOYER_STD_V3";
pub const ROLE_ID: &str = "role#ai_engineer";
pub const JD_ID: &str = "jd#ai_lead_gov_2025";

pub struct TestEnv {
    pub data: MockServer,
    pub generation: MockServer,
    pub base_url: String,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestEnv {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("orchestrator unreachable")
    }

    /// Bodies the generation service received, in order.
    pub async fn generation_payloads(&self) -> Vec<Value> {
        self.generation
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.body_json::<Value>().expect("generation payload is JSON"))
            .collect()
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config pointing at the mock servers, with retry delays shortened.
pub fn test_config(data: &MockServer, generation: &MockServer) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.data_api.base_url = Some(data.uri());
    config.generation_api.base_url = Some(generation.uri());
    config.data_api.timeout_secs = 5;
    config.generation_api.timeout_secs = 10;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}

/// Start mocks and an orchestrator. `tweak` adjusts the config before the
/// server is built.
pub async fn start(tweak: impl FnOnce(&mut ServiceConfig)) -> TestEnv {
    let data = MockServer::start().await;
    let generation = MockServer::start().await;

    let mut config = test_config(&data, &generation);
    tweak(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).expect("server builds");
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap();

    TestEnv {
        data,
        generation,
        base_url: format!("http://{addr}"),
        client,
        shutdown,
    }
}

pub fn student_profile() -> Value {
    json!({
        "student_id": STUDENT_ID,
        "personal_info": {"name": "Ann Example", "email": "ann@example.com"},
        "skills": [{"id": "skill#python", "name": "Python", "level": "L3_Advanced"}]
    })
}

pub fn template_info() -> Value {
    json!({"template_id": TEMPLATE_ID, "layout": "two-column"})
}

pub fn role_taxonomy(skills: Value) -> Value {
    json!({"role_id": ROLE_ID, "role_title": "AI Engineer", "role_required_skills": skills})
}

pub fn jd_taxonomy(skills: Value) -> Value {
    json!({
        "job_id": JD_ID,
        "job_title": "AI Lead",
        "job_required_skills": skills,
        "job_responsibilities": [{"responsibility": "Lead model delivery"}]
    })
}

pub fn generation_result() -> Value {
    json!({
        "job_id": "JOB_abc123",
        "template_id": TEMPLATE_ID,
        "language": "en",
        "language_tone": "formal",
        "rendered_html": "<h1>Ann Example</h1>",
        "sections": {
            "profile_summary": {
                "text": "Machine learning engineer focused on applied NLP.",
                "word_count": 7,
                "matched_jd_skills": ["Python"],
                "confidence_score": 0.93
            },
            "skills": {"text": "Python, PyTorch, SQL"}
        },
        "metadata": {
            "generated_at": "2025-06-01T10:00:00Z",
            "model_version": "gen-2025-05",
            "tokens_used": 2048,
            "cost_estimate_usd": 0.012,
            "request_id": "REQ_777"
        }
    })
}

pub async fn mount_json(server: &MockServer, http_method: &str, route: &str, status: u16, body: Value) {
    Mock::given(method(http_method))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount student, template, role and JD objects with the given skill lists.
pub async fn mount_upstream_data(env: &TestEnv, role_skills: Value, jd_skills: Value) {
    mount_json(&env.data, "GET", "/v1/students/U-1001/full-profile", 200, student_profile()).await;
    mount_json(&env.data, "GET", "/v1/templates/T_EMPLOYER_STD_V3", 200, template_info()).await;
    mount_json(&env.data, "GET", "/v1/roles/role%23ai_engineer", 200, role_taxonomy(role_skills)).await;
    mount_json(&env.data, "GET", "/v1/jds/jd%23ai_lead_gov_2025", 200, jd_taxonomy(jd_skills)).await;
}

pub async fn mount_generation_ok(env: &TestEnv) {
    mount_json(&env.generation, "POST", "/v1/generate_cv", 200, generation_result()).await;
}

pub fn camel_request() -> Value {
    json!({
        "studentId": STUDENT_ID,
        "templateId": TEMPLATE_ID,
        "language": "en",
        "languageTone": "formal",
        "sections": ["profile_summary", "skills"],
        "roleId": ROLE_ID,
        "jdId": JD_ID,
        "userOrLlmComments": {"profile_summary": "Keep it under 60 words"},
        "requestMetadata": {"client": "web", "trace": {"Span_Id": "abc"}}
    })
}

pub fn snake_request() -> Value {
    json!({
        "student_id": STUDENT_ID,
        "template_id": TEMPLATE_ID,
        "language": "en",
        "language_tone": "formal",
        "sections": ["profile_summary", "skills"],
        "role_id": ROLE_ID,
        "jd_id": JD_ID,
        "user_or_llm_comments": {"profile_summary": "Keep it under 60 words"},
        "request_metadata": {"client": "web", "trace": {"Span_Id": "abc"}}
    })
}
