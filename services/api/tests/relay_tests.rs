//! Integration tests for the assistant relay endpoint and the upstream
//! gateway adapter.
//!
//! Handler behavior is exercised through the router with `oneshot` requests;
//! upstream classification is exercised against a real local HTTP stub so
//! the full reqwest path runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use api_lib::adapters::{build_system_prompt, GatewayChatAdapter, RelayClientAdapter};
use api_lib::config::Config;
use api_lib::session::SessionController;
use api_lib::web::create_router;
use api_lib::web::state::AppState;
use farm_assistant_core::domain::MessageRole;
use farm_assistant_core::ports::{AssistantService, PortError, PortResult};

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        gateway_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        gateway_api_key: Some("test-key".to_string()),
        chat_model: "test-model".to_string(),
        upstream_timeout: Duration::from_secs(5),
    }
}

/// A scripted stand-in for the upstream adapter behind the handler.
struct StubAssistant {
    script: PortResult<String>,
    calls: AtomicUsize,
}

impl StubAssistant {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(error: PortError) -> Arc<Self> {
        Arc::new(Self {
            script: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantService for StubAssistant {
    async fn reply(&self, _message: &str, _language_hint: Option<&str>) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Ok(text) => Ok(text.clone()),
            Err(PortError::RateLimited(msg)) => Err(PortError::RateLimited(msg.clone())),
            Err(PortError::Exhausted(msg)) => Err(PortError::Exhausted(msg.clone())),
            Err(other) => Err(PortError::Unexpected(other.to_string())),
        }
    }
}

/// Create a relay router around the given assistant implementation.
fn make_app(assistant: Arc<dyn AssistantService>) -> Router {
    create_router(Arc::new(AppState {
        config: Arc::new(test_config()),
        assistant,
    }))
}

/// Build a POST /assistant request with a JSON body and a client origin.
fn assistant_post(body: Value) -> Request<Body> {
    Request::post("/assistant")
        .header("origin", "https://farm.example")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read full response body bytes as JSON.
async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Spawn a stub upstream gateway returning a fixed status and body, and
/// count how many requests reach it.
async fn spawn_upstream(status: StatusCode, body: Value) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_inner = hits.clone();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let hits = hits_inner.clone();
            let body = body.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/chat/completions", addr), hits)
}

fn adapter_for(url: &str, api_key: Option<&str>) -> GatewayChatAdapter {
    GatewayChatAdapter::new(
        url.to_string(),
        api_key.map(str::to_string),
        "test-model".to_string(),
        Duration::from_secs(5),
    )
    .unwrap()
}

// =============================================================================
// Handler behavior (stubbed assistant)
// =============================================================================

#[tokio::test]
async fn pest_question_gets_a_reply() {
    let assistant = StubAssistant::replying("Check for aphids and apply neem oil.");
    let app = make_app(assistant);

    let resp = app
        .oneshot(assistant_post(
            json!({"message": "My crops have pests", "language": "en-IN"}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let body = body_json(resp).await;
    assert_eq!(body, json!({"reply": "Check for aphids and apply neem oil."}));
}

#[tokio::test]
async fn missing_language_hint_is_tolerated() {
    let assistant = StubAssistant::replying("Plant pulses after the harvest.");
    let app = make_app(assistant);

    let resp = app
        .oneshot(assistant_post(json!({"message": "What should I plant next?"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_message_is_rejected_before_the_service_runs() {
    let assistant = StubAssistant::replying("unused");
    let app = make_app(assistant.clone());

    let resp = app
        .oneshot(assistant_post(json!({"message": "   "})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
    assert_eq!(assistant.calls(), 0);
}

#[tokio::test]
async fn rate_limited_service_maps_to_429() {
    let assistant = StubAssistant::failing(PortError::RateLimited(
        "Too many requests. Please try again in a moment.".to_string(),
    ));
    let app = make_app(assistant);

    let resp = app
        .oneshot(assistant_post(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    // Error responses carry the permissive CORS headers too.
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("try again"));
}

#[tokio::test]
async fn exhausted_service_maps_to_402() {
    let assistant = StubAssistant::failing(PortError::Exhausted(
        "Service temporarily unavailable. Please try again later.".to_string(),
    ));
    let app = make_app(assistant);

    let resp = app
        .oneshot(assistant_post(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("temporarily unavailable"));
}

#[tokio::test]
async fn unexpected_service_error_maps_to_500() {
    let assistant = StubAssistant::failing(PortError::Unexpected("AI service error".to_string()));
    let app = make_app(assistant);

    let resp = app
        .oneshot(assistant_post(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn options_preflight_succeeds_with_cors_headers_and_empty_body() {
    let assistant = StubAssistant::replying("unused");
    let app = make_app(assistant.clone());

    let resp = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/assistant")
                .header("origin", "https://farm.example")
                .header("access-control-request-method", "POST")
                .header(
                    "access-control-request-headers",
                    "authorization, x-client-info, apikey, content-type",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let allowed = resp
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    for header in ["authorization", "x-client-info", "apikey", "content-type"] {
        assert!(allowed.contains(header), "missing {header} in {allowed}");
    }

    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert!(bytes.is_empty());
    assert_eq!(assistant.calls(), 0);
}

// =============================================================================
// Upstream gateway adapter (real HTTP against a local stub)
// =============================================================================

#[tokio::test]
async fn adapter_extracts_the_first_completion() {
    let (url, hits) = spawn_upstream(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "Check for aphids and apply neem oil."}}]}),
    )
    .await;
    let adapter = adapter_for(&url, Some("test-key"));

    let reply = adapter
        .reply("My crops have pests", Some("en-IN"))
        .await
        .unwrap();

    assert_eq!(reply, "Check for aphids and apply neem oil.");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn adapter_substitutes_the_fallback_for_empty_completions() {
    let (url, _hits) = spawn_upstream(StatusCode::OK, json!({"choices": []})).await;
    let adapter = adapter_for(&url, Some("test-key"));

    let reply = adapter.reply("hello", None).await.unwrap();

    assert_eq!(reply, "I couldn't process your request. Please try again.");
}

#[tokio::test]
async fn adapter_classifies_upstream_rate_limiting() {
    let (url, _hits) = spawn_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": "slow down"}),
    )
    .await;
    let adapter = adapter_for(&url, Some("test-key"));

    let err = adapter.reply("hello", None).await.unwrap_err();
    assert!(matches!(err, PortError::RateLimited(_)));
}

#[tokio::test]
async fn adapter_classifies_upstream_quota_exhaustion() {
    let (url, _hits) = spawn_upstream(
        StatusCode::PAYMENT_REQUIRED,
        json!({"error": "quota spent"}),
    )
    .await;
    let adapter = adapter_for(&url, Some("test-key"));

    let err = adapter.reply("hello", None).await.unwrap_err();
    assert!(matches!(err, PortError::Exhausted(_)));
}

#[tokio::test]
async fn adapter_treats_other_upstream_failures_as_generic() {
    let (url, _hits) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "boom"}),
    )
    .await;
    let adapter = adapter_for(&url, Some("test-key"));

    let err = adapter.reply("hello", None).await.unwrap_err();
    assert!(matches!(err, PortError::Unexpected(_)));
}

#[tokio::test]
async fn missing_credential_fails_without_any_upstream_call() {
    let (url, hits) = spawn_upstream(StatusCode::OK, json!({"choices": []})).await;
    let adapter = adapter_for(&url, None);

    let err = adapter.reply("hello", None).await.unwrap_err();

    assert!(matches!(err, PortError::Unexpected(_)));
    assert!(err.to_string().contains("not configured"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_credential_surfaces_as_500_through_the_relay() {
    let (url, hits) = spawn_upstream(StatusCode::OK, json!({"choices": []})).await;
    let adapter = Arc::new(adapter_for(&url, None));
    let app = make_app(adapter);

    let resp = app
        .oneshot(assistant_post(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_rate_limit_flows_through_the_relay_as_429() {
    let (url, _hits) = spawn_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": "slow down"}),
    )
    .await;
    let adapter = Arc::new(adapter_for(&url, Some("test-key")));
    let app = make_app(adapter);

    let resp = app
        .oneshot(assistant_post(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("try again"));
}

// =============================================================================
// Relay client adapter (the session controller's side of the wire)
// =============================================================================

/// Serve the relay router on an ephemeral port and return its endpoint URL.
async fn spawn_relay(assistant: Arc<dyn AssistantService>) -> String {
    let app = make_app(assistant);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/assistant", addr)
}

#[tokio::test]
async fn relay_client_round_trips_a_reply() {
    let endpoint = spawn_relay(StubAssistant::replying("Use neem oil.")).await;
    let client = RelayClientAdapter::new(endpoint, Duration::from_secs(5)).unwrap();

    let reply = client
        .reply("My crops have pests", Some("en-IN"))
        .await
        .unwrap();

    assert_eq!(reply, "Use neem oil.");
}

#[tokio::test]
async fn relay_client_maps_statuses_back_to_error_classes() {
    let endpoint = spawn_relay(StubAssistant::failing(PortError::RateLimited(
        "Too many requests. Please try again in a moment.".to_string(),
    )))
    .await;
    let client = RelayClientAdapter::new(endpoint, Duration::from_secs(5)).unwrap();
    let err = client.reply("hello", None).await.unwrap_err();
    assert!(matches!(err, PortError::RateLimited(_)));
    assert!(err.to_string().contains("try again"));

    let endpoint = spawn_relay(StubAssistant::failing(PortError::Exhausted(
        "Service temporarily unavailable. Please try again later.".to_string(),
    )))
    .await;
    let client = RelayClientAdapter::new(endpoint, Duration::from_secs(5)).unwrap();
    let err = client.reply("hello", None).await.unwrap_err();
    assert!(matches!(err, PortError::Exhausted(_)));
}

#[tokio::test]
async fn session_controller_talks_to_the_relay_end_to_end() {
    // Full loop: controller -> relay client -> relay router -> gateway
    // adapter -> stub upstream.
    let (url, hits) = spawn_upstream(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "Check for aphids and apply neem oil."}}]}),
    )
    .await;
    let gateway = Arc::new(adapter_for(&url, Some("test-key")));
    let endpoint = spawn_relay(gateway).await;
    let client = Arc::new(RelayClientAdapter::new(endpoint, Duration::from_secs(5)).unwrap());

    let (controller, _notices) = SessionController::new(client, None, None);
    controller.submit("My crops have pests").await;

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "Check for aphids and apply neem oil.");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Prompt contract
// =============================================================================

#[tokio::test]
async fn system_prompt_keeps_the_language_contract() {
    let hinted = build_system_prompt(Some("hi-IN"));
    assert!(hinted.contains("agricultural assistant"));
    assert!(hinted.contains("ALWAYS respond in the SAME language"));
    assert!(hinted.contains("language hint provided: hi-IN"));

    let unhinted = build_system_prompt(None);
    assert!(unhinted.contains("language hint provided: auto-detect"));
}
