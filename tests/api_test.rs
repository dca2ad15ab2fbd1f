//! Router-level tests for `/embed` and `/health` using the mock delegate

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use transcript_embedder::{
    api::{build_router, AppState},
    config::{AuthConfig, Config},
    embedding::{MockBehavior, MockCounters, MockDelegateFactory},
    error::EmbeddingError,
    reclaim::{ReclaimError, ReclaimStep, ResourceReclaimer, StepOutcome},
};

/// Counts reclaim passes
struct CountingStep(Arc<AtomicUsize>);

impl ReclaimStep for CountingStep {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn run(&self) -> Result<StepOutcome, ReclaimError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(StepOutcome::Completed)
    }
}

struct TestApp {
    router: Router,
    counters: Arc<MockCounters>,
    reclaims: Arc<AtomicUsize>,
}

fn test_app(token: &str, behavior: MockBehavior) -> TestApp {
    let config = Config {
        auth: AuthConfig::with_token(token),
        ..Config::default()
    };
    let factory = MockDelegateFactory::with_behavior(behavior);
    let counters = factory.counters();
    let reclaims = Arc::new(AtomicUsize::new(0));

    let state = AppState::new(&config, Arc::new(factory))
        .with_reclaimer(ResourceReclaimer::new().with_step(CountingStep(reclaims.clone())));

    TestApp {
        router: build_router(state, &config.server),
        counters,
        reclaims,
    }
}

fn embed_request(auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/embed")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_embed_passes_delegate_result_through() {
    let canned = json!({"vectors": [[0.5, 0.25]], "anything": {"nested": true}});
    let app = test_app("secret123", MockBehavior::Respond(canned.clone()));

    let (status, body) = send(
        &app.router,
        embed_request(
            Some("Bearer secret123"),
            r#"{"chunks": ["hello world"], "model": "all-MiniLM-L6-v2"}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, canned);
    assert_eq!(
        app.counters.calls(),
        vec![("all-MiniLM-L6-v2".to_string(), vec![json!("hello world")])]
    );
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
    assert_eq!(app.counters.cleaned(), 1);
}

#[tokio::test]
async fn test_wrong_token_is_rejected_without_delegate() {
    let app = test_app("secret123", MockBehavior::Succeed);

    let (status, body) = send(
        &app.router,
        embed_request(Some("Bearer wrong"), r#"{"chunks": ["hello world"]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert!(!body["error"].as_str().unwrap().contains("secret123"));
    assert_eq!(app.counters.created(), 0);
    assert_eq!(app.counters.embedded(), 0);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let app = test_app("secret123", MockBehavior::Succeed);

    let (status, _) = send(&app.router, embed_request(None, r#"{"chunks": ["a"]}"#)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.counters.created(), 0);
}

#[tokio::test]
async fn test_open_mode_without_configured_token() {
    let app = test_app("", MockBehavior::Succeed);

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": ["a"]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_default_model_is_used() {
    let app = test_app("", MockBehavior::Succeed);

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": [{"text": "hi", "start": 0.0}]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "all-MiniLM-L6-v2");
    assert_eq!(body["chunks"][0]["start"], 0.0);
    assert_eq!(app.counters.calls()[0].0, "all-MiniLM-L6-v2");
}

#[tokio::test]
async fn test_missing_or_empty_chunks() {
    let app = test_app("secret123", MockBehavior::Succeed);

    for body in [r#"{"model": "all-MiniLM-L6-v2"}"#, r#"{"chunks": []}"#, r#"{"chunks": null}"#] {
        let (status, response) = send(&app.router, embed_request(Some("Bearer secret123"), body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(response, json!({"error": "No transcript provided"}));
    }

    assert_eq!(app.counters.created(), 0);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_missing_or_empty_body() {
    let app = test_app("secret123", MockBehavior::Succeed);

    for body in ["", "{}", "null"] {
        let (status, response) = send(&app.router, embed_request(Some("Bearer secret123"), body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {:?}", body);
        assert_eq!(response, json!({"error": "No transcript JSON provided"}));
    }

    assert_eq!(app.reclaims.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app("", MockBehavior::Succeed);

    let (status, body) = send(&app.router, embed_request(None, "{\"chunks\": [")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed JSON body"));
}

#[tokio::test]
async fn test_invalid_model_is_bad_request_without_delegate() {
    let app = test_app("", MockBehavior::Succeed);

    for body in [
        r#"{"chunks": ["a"], "model": ""}"#,
        r#"{"chunks": ["a"], "model": "   "}"#,
        r#"{"chunks": ["a"], "model": 7}"#,
    ] {
        let (status, response) = send(&app.router, embed_request(None, body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(response["error"].is_string());
    }

    assert_eq!(app.counters.created(), 0);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_delegate_failure_is_internal_error() {
    let failure = EmbeddingError::Inference("CUDA out of memory".to_string());
    let app = test_app("", MockBehavior::FailEmbed(failure.clone()));

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": ["a"]}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": failure.to_string()}));
    assert_eq!(app.counters.cleaned(), 1);
    assert_eq!(app.counters.dropped(), 1);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delegate_construction_failure_is_internal_error() {
    let failure = EmbeddingError::UnsupportedModel("bogus".to_string());
    let app = test_app("", MockBehavior::FailCreate(failure.clone()));

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": ["a"], "model": "bogus"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], failure.to_string());
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delegate_panic_is_internal_error_and_reclaimed() {
    let app = test_app("", MockBehavior::PanicEmbed("tensor shape mismatch".to_string()));

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": ["a"]}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal error: tensor shape mismatch");
    assert_eq!(app.counters.cleaned(), 1);
    assert_eq!(app.counters.dropped(), 1);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cleanup_failure_does_not_change_response() {
    let app = test_app("", MockBehavior::FailCleanup(EmbeddingError::Cleanup("busy".to_string())));

    let (status, body) = send(&app.router, embed_request(None, r#"{"chunks": ["a"]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(app.counters.dropped(), 1);
    assert_eq!(app.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_reclaim_per_request() {
    let app = test_app("secret123", MockBehavior::Succeed);

    let requests = [
        (Some("Bearer secret123"), r#"{"chunks": ["a"]}"#),
        (Some("Bearer wrong"), r#"{"chunks": ["a"]}"#),
        (Some("Bearer secret123"), r#"{"chunks": []}"#),
        (Some("Bearer secret123"), ""),
        (Some("Bearer secret123"), r#"{"chunks": [42]}"#),
    ];
    for (auth, body) in requests {
        send(&app.router, embed_request(auth, body)).await;
    }

    assert_eq!(app.reclaims.load(Ordering::SeqCst), requests.len());
    assert_eq!(app.counters.created(), app.counters.dropped());
    assert_eq!(app.counters.created(), app.counters.cleaned());
}

#[tokio::test]
async fn test_health_is_fixed_and_side_effect_free() {
    let app = test_app("secret123", MockBehavior::Succeed);

    for _ in 0..3 {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    assert_eq!(app.reclaims.load(Ordering::SeqCst), 0);
    assert_eq!(app.counters.created(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = test_app("", MockBehavior::Succeed);
    let big = format!(r#"{{"chunks": ["{}"]}}"#, "x".repeat(11 * 1024 * 1024));

    let response = app.router.clone().oneshot(embed_request(None, &big)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.counters.created(), 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app("", MockBehavior::Succeed);
    send(&app.router, embed_request(None, r#"{"chunks": ["a", "b"]}"#)).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("transcript_embedder_embed_requests_total 1"));
    assert!(text.contains("transcript_embedder_chunks_embedded_total 2"));
    assert!(text.contains("transcript_embedder_reclaim_runs_total 1"));
}
