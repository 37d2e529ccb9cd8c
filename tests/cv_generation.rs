//! End-to-end tests: real router and HTTP clients against mocked data and
//! generation services.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod common;

use common::*;

const CANONICAL: &str = "/api/v1/cv-generations";
const LEGACY: &str = "/v1/orchestrator/generate-cv";

#[tokio::test]
async fn test_canonical_and_legacy_endpoints_return_identical_bodies() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!(["Python", {"skill_name": "PyTorch"}]), json!([{"skill_id": "SK_SQL"}])).await;
    mount_generation_ok(&env).await;

    let canonical = env.post(CANONICAL, &camel_request()).await;
    let legacy = env.post(LEGACY, &camel_request()).await;

    assert_eq!(canonical.status(), 201);
    assert_eq!(legacy.status(), 200);
    assert_eq!(canonical.headers()["x-api-version"], "1");
    assert_eq!(legacy.headers()["x-api-version"], "1");

    let canonical: Value = canonical.json().await.unwrap();
    let legacy: Value = legacy.json().await.unwrap();
    assert_eq!(canonical, legacy);

    assert_eq!(canonical["status"], "success");
    assert!(canonical["error"].is_null());
    let cv = &canonical["cv"];
    assert_eq!(cv["jobId"], "JOB_abc123");
    assert_eq!(cv["templateId"], TEMPLATE_ID);
    assert_eq!(cv["renderedHtml"], "<h1>Ann Example</h1>");
    assert_eq!(cv["sections"]["profile_summary"]["wordCount"], 7);
    assert_eq!(cv["sections"]["skills"]["wordCount"], 3);
    assert_eq!(cv["metadata"]["modelVersion"], "gen-2025-05");
    assert_eq!(cv["rawGenerationResult"], generation_result());

    assert_eq!(canonical["userOrLlmComments"], json!({"profile_summary": "Keep it under 60 words"}));
    assert_eq!(canonical["requestMetadata"], json!({"client": "web", "trace": {"Span_Id": "abc"}}));
}

#[tokio::test]
async fn test_snake_and_camel_requests_build_the_same_payload() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!(["Python"]), json!(["SQL"])).await;
    mount_generation_ok(&env).await;

    assert_eq!(env.post(CANONICAL, &snake_request()).await.status(), 201);
    assert_eq!(env.post(CANONICAL, &camel_request()).await.status(), 201);

    let payloads = env.generation_payloads().await;
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);

    let payload = &payloads[0];
    assert_eq!(payload["user_id"], STUDENT_ID);
    assert_eq!(payload["cv_language"], "en");
    assert_eq!(payload["sections"], json!(["profile_summary", "skills"]));
    assert_eq!(payload["job_role_info"]["role_required_skills"], json!(["Python"]));
    assert_eq!(payload["job_position_info"]["jd_id"], JD_ID);
    assert_eq!(payload["jd_required_skills"], json!(["SQL"]));
    assert!(payload.get("user_or_llm_comments").is_none());
}

#[tokio::test]
async fn test_comments_forwarded_when_feature_enabled() {
    let env = start(|c| c.features.enable_user_or_llm_comments = true).await;
    mount_upstream_data(&env, json!(["Python"]), json!([])).await;
    mount_generation_ok(&env).await;

    assert_eq!(env.post(CANONICAL, &camel_request()).await.status(), 201);
    let payloads = env.generation_payloads().await;
    assert_eq!(
        payloads[0]["user_or_llm_comments"],
        json!({"profile_summary": "Keep it under 60 words"})
    );
}

#[tokio::test]
async fn test_correlation_id_generated_echoed_and_forwarded() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!(["Python"]), json!([])).await;
    mount_generation_ok(&env).await;

    let generated = env.post(CANONICAL, &camel_request()).await;
    let id = generated.headers()["x-correlation-id"].to_str().unwrap().to_string();
    let hex = id.strip_prefix("corr_").expect("generated id carries the prefix");
    assert_eq!(hex.len(), 32);
    assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

    let echoed = env
        .client
        .post(env.url(CANONICAL))
        .header("X-Correlation-Id", "client-supplied-42")
        .json(&camel_request())
        .send()
        .await
        .unwrap();
    assert_eq!(echoed.headers()["x-correlation-id"], "client-supplied-42");

    let forwarded = env.generation.received_requests().await.unwrap();
    assert_eq!(forwarded.last().unwrap().headers["x-correlation-id"], "client-supplied-42");
}

#[tokio::test]
async fn test_unsupported_api_version_rejected_before_upstream_calls() {
    let env = start(|_| {}).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&env.data)
        .await;

    for endpoint in [CANONICAL, LEGACY] {
        let response = env
            .client
            .post(env.url(endpoint))
            .header("X-API-Version", "2")
            .header("X-Correlation-Id", "corr-version")
            .json(&camel_request())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(response.headers()["x-api-version"], "1");
        assert_eq!(response.headers()["x-correlation-id"], "corr-version");

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "INVALID_FIELD_VALUE");
        assert_eq!(body["error"]["subErrors"][0]["field"], "X-API-Version");
        assert_eq!(body["error"]["correlationId"], "corr-version");
    }
}

#[tokio::test]
async fn test_validation_errors_aggregated_without_upstream_calls() {
    let env = start(|_| {}).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&env.data)
        .await;

    let response = env
        .post(
            CANONICAL,
            &json!({
                "templateId": TEMPLATE_ID,
                "language": "TH",
                "languageTone": "sarcastic",
                "favouriteColour": "blue",
                "shoeSize": 42
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["cv"].is_null());
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

    let fields: Vec<&str> = body["error"]["subErrors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["field"].as_str().unwrap())
        .collect();
    for expected in ["favouriteColour", "shoeSize", "studentId", "language", "languageTone"] {
        assert!(fields.contains(&expected), "missing sub-error for {expected}: {fields:?}");
    }
}

#[tokio::test]
async fn test_missing_student_yields_404_naming_student() {
    let env = start(|_| {}).await;
    mount_json(&env.data, "GET", "/v1/students/U-1001/full-profile", 404, json!({"detail": "Not Found"})).await;
    mount_json(&env.data, "GET", "/v1/templates/T_EMPLOYER_STD_V3", 200, template_info()).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generation_result()))
        .expect(0)
        .mount(&env.generation)
        .await;

    let response = env
        .post(CANONICAL, &json!({"studentId": STUDENT_ID, "templateId": TEMPLATE_ID}))
        .await;
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
    let subs = body["error"]["subErrors"].as_array().unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0]["field"], "student_id");
    assert_eq!(subs[0]["errors"][0]["code"], "not_found");
}

#[tokio::test]
async fn test_role_without_skills_fails_stage0_but_empty_jd_skills_pass() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!([]), json!([])).await;
    mount_generation_ok(&env).await;

    let with_role = env.post(CANONICAL, &camel_request()).await;
    assert_eq!(with_role.status(), 400);
    let body: Value = with_role.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ORCH_STAGE0_BUILD_ERROR");
    assert_eq!(body["error"]["subErrors"][0]["field"], "role_required_skills");
    assert!(body["error"]["subErrors"][0]["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("role_required_skills"));
    assert_eq!(body["requestMetadata"]["client"], "web");

    let mut jd_only = camel_request();
    jd_only.as_object_mut().unwrap().remove("roleId");
    let response = env.post(CANONICAL, &jd_only).await;
    assert_eq!(response.status(), 201);
    assert_eq!(env.generation_payloads().await.len(), 1);
}

#[tokio::test]
async fn test_generation_5xx_exhausts_retries() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!(["Python"]), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/v1/generate_cv"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model pool saturated"))
        .expect(3)
        .mount(&env.generation)
        .await;

    let response = env.post(CANONICAL, &camel_request()).await;
    assert_eq!(response.status(), 500);
    assert!(response.headers().contains_key("x-correlation-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
    assert!(!body.to_string().contains("model pool saturated"));
}

#[tokio::test]
async fn test_generation_timeouts_exhaust_retries() {
    let env = start(|c| c.generation_api.timeout_secs = 1).await;
    mount_upstream_data(&env, json!(["Python"]), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/v1/generate_cv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(generation_result())
                .set_delay(Duration::from_secs(3)),
        )
        .expect(3)
        .mount(&env.generation)
        .await;

    let response = env.post(CANONICAL, &camel_request()).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
}

#[tokio::test]
async fn test_generation_4xx_is_fatal_without_retry() {
    let env = start(|_| {}).await;
    mount_upstream_data(&env, json!(["Python"]), json!([])).await;
    Mock::given(method("POST"))
        .and(path("/v1/generate_cv"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": "GEN_PAYLOAD_REJECTED",
            "message": "student_profile.email is invalid: ann@example"
        })))
        .expect(1)
        .mount(&env.generation)
        .await;

    let response = env.post(LEGACY, &camel_request()).await;
    assert_eq!(response.status(), 502);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "GEN_PAYLOAD_REJECTED");
    assert!(!body.to_string().contains("ann@example"));
}

#[tokio::test]
async fn test_health_reports_service_identity() {
    let env = start(|c| c.service.environment = "staging".into()).await;

    for route in ["/health", "/healthz"] {
        let response = env.client.get(env.url(route)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key("x-correlation-id"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({"status": "ok", "service": "eport_orchestrator_api", "environment": "staging"})
        );
    }
}
