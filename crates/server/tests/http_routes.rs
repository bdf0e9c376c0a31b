use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use answer_agent::{LlmClient, LlmRequest};
use answer_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use answer_server::bootstrap_with_llm;

/// Answers extraction prompts with a complete local question and drafts with a fixed reply.
struct FixedLlm;

#[async_trait]
impl LlmClient for FixedLlm {
    fn model(&self) -> &str {
        "fixed-model"
    }

    async fn complete_json(&self, request: &LlmRequest) -> Result<Value> {
        if request.user_prompt.starts_with("Question:") {
            return Ok(json!({
                "intent": "PART_AVAILABILITY_LOCAL",
                "entities": {
                    "part": { "name": "alternator" },
                    "location": { "postal_code": "80112" }
                }
            }));
        }
        Ok(json!({
            "answer": "Yes, one is on the shelf.",
            "reason": "Listed nearby.",
            "next_action": "Call the store."
        }))
    }
}

async fn app(api_key: Option<&str>, rate_limit: u32) -> Router {
    let mut config = AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            database_url: Some("sqlite::memory:".to_owned()),
            auth_api_key: api_key.map(str::to_owned),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .expect("config");
    config.server.rate_limit_per_minute = rate_limit;

    bootstrap_with_llm(config, Arc::new(FixedLlm)).await.expect("bootstrap").router()
}

fn post(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder =
        Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_service_and_version() {
    let response = app(None, 60)
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "answer-engine");
    assert_eq!(body["database"]["status"], "ready");
}

#[tokio::test]
async fn answer_route_returns_traced_answer() {
    let response = app(None, 60)
        .await
        .oneshot(post("/answer", json!({ "question": "alternator near 80112?" }), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["answer"], "Yes, one is on the shelf.");
    assert_eq!(body["confidence"], "high");
    assert_eq!(body["intent"], "PART_AVAILABILITY_LOCAL");
    assert_eq!(body["trace"]["provider"]["llm_model"], "fixed-model");
}

#[tokio::test]
async fn answer_route_rejects_invalid_bodies() {
    let router = app(None, 60).await;

    let missing = router
        .clone()
        .oneshot(post("/answer", json!({ "context": {} }), None))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body = read_json(missing).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0], "question: required");

    let malformed = Request::builder()
        .method("POST")
        .uri("/answer")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = router.oneshot(malformed).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "validation_error");
}

#[tokio::test]
async fn api_key_is_enforced_when_configured() {
    let router = app(Some("s3cret"), 60).await;

    let denied = router
        .clone()
        .oneshot(post("/answer", json!({ "question": "alternator?" }), Some("wrong")))
        .await
        .expect("response");
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(denied).await, json!({ "error": "unauthorized" }));

    let allowed = router
        .clone()
        .oneshot(post("/answer", json!({ "question": "alternator?" }), Some("s3cret")))
        .await
        .expect("response");
    assert_eq!(allowed.status(), StatusCode::OK);

    let health = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_rejects_requests_over_the_window_budget() {
    let router = app(None, 1).await;

    let first = router
        .clone()
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c1" }), None))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c1" }), None))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(read_json(second).await["error"], "rate_limited");
}

#[tokio::test]
async fn engine_turns_keep_state_per_conversation() {
    let router = app(None, 60).await;

    let first = router
        .clone()
        .oneshot(post("/engine/turn", json!({ "conversation_id": "conv-http" }), None))
        .await
        .expect("response");
    let first = read_json(first).await;
    assert_eq!(first["type"], "ask_location");
    assert_eq!(
        first["message"],
        "I don\u{2019}t have your location. What city or ZIP should I search near?"
    );

    let second = router
        .clone()
        .oneshot(post(
            "/engine/turn",
            json!({
                "conversation_id": "conv-http",
                "locationInput": "80112",
                "candidates": {
                    "provider": [{
                        "id": "a", "name": "Acme", "source": "provider",
                        "authority": 1, "agreement": 1, "freshness": 1,
                        "distanceMiles": 2, "availability": "in stock", "openNow": true
                    }]
                }
            }),
            None,
        ))
        .await
        .expect("response");
    let second = read_json(second).await;
    assert_eq!(second["type"], "answer");
    assert_eq!(second["turn"], 2);
    assert_eq!(second["state"]["lastLocation"], "80112");
    assert_eq!(second["actions"], json!(["call", "directions"]));

    let missing_id = router
        .oneshot(post("/engine/turn", json!({ "locationInput": "80112" }), None))
        .await
        .expect("response");
    assert_eq!(missing_id.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_tokens_do_not_consume_rate_limit_windows() {
    let router = app(Some("s3cret"), 1).await;

    for attempt in 0..3 {
        let response = router
            .clone()
            .oneshot(post(
                "/engine/turn",
                json!({ "conversation_id": "c-auth" }),
                Some(&format!("guess-{attempt}")),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let allowed = router
        .clone()
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c-auth" }), Some("s3cret")))
        .await
        .expect("response");
    assert_eq!(allowed.status(), StatusCode::OK);

    let limited = router
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c-auth" }), Some("s3cret")))
        .await
        .expect("response");
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn open_routes_share_one_window_whatever_the_token() {
    let router = app(None, 1).await;

    let first = router
        .clone()
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c-open" }), Some("one")))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(post("/engine/turn", json!({ "conversation_id": "c-open" }), Some("two")))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
