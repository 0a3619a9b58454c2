//! Tests for LlamaServerAdapter against an in-process fake completion server

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tandem_core::config::ModelConfig;
use tandem_core::{CodeMemory, ModelContext, ModelRole, SamplingHint};
use tandem_models::{LlamaServerAdapter, ModelAdapter};
use tokio::net::TcpListener;

// ============================================================================
// Fake server
// ============================================================================

#[derive(Clone, Default)]
struct FakeServer {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn healthy_server() -> (String, FakeServer) {
    let fake = FakeServer::default();
    let router = Router::new()
        .route(
            "/completion",
            post(|State(fake): State<FakeServer>, Json(body): Json<Value>| async move {
                fake.requests.lock().unwrap().push(body);
                Json(json!({ "content": "```python\nprint(1)\n```", "stop": true }))
            }),
        )
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .with_state(fake.clone());
    (spawn(router).await, fake)
}

fn config_for(endpoint: &str) -> ModelConfig {
    ModelConfig {
        endpoint: endpoint.to_string(),
        max_tokens: 256,
        temperature: 0.5,
        stop_sequences: vec!["</s>".to_string()],
        generation_timeout_secs: 5,
    }
}

fn context(prompt: &str, sampling: SamplingHint) -> ModelContext {
    ModelContext {
        system_preamble: "You write code.".to_string(),
        history_window: Vec::new(),
        prompt: prompt.to_string(),
        target_model: ModelRole::Code,
        code_memory: CodeMemory::default(),
        language_hint: None,
        sampling,
    }
}

// ============================================================================
// Generation
// ============================================================================

#[tokio::test]
async fn test_generate_posts_completion_request() {
    let (endpoint, fake) = healthy_server().await;
    let adapter = LlamaServerAdapter::new(ModelRole::Code, config_for(&endpoint)).unwrap();

    let text = adapter
        .generate(&context("print one", SamplingHint::Creative))
        .await
        .unwrap();
    assert_eq!(text, "```python\nprint(1)\n```");

    let requests = fake.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let body = &requests[0];
    assert_eq!(body["n_predict"], 256);
    assert_eq!(body["stop"], json!(["</s>"]));
    assert!((body["temperature"].as_f64().unwrap() - 0.75).abs() < 1e-3);
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("You write code."));
    assert!(prompt.ends_with("User: print one\nAssistant:"));
}

#[tokio::test]
async fn test_error_status_maps_to_generation_error() {
    let router = Router::new().route(
        "/completion",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "kv cache full") }),
    );
    let endpoint = spawn(router).await;
    let adapter = LlamaServerAdapter::new(ModelRole::Code, config_for(&endpoint)).unwrap();

    let err = adapter
        .generate(&context("x", SamplingHint::Balanced))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "generation_error");
    assert!(err.to_string().contains("kv cache full"));
}

#[tokio::test]
async fn test_loading_model_maps_to_unavailable() {
    let router = Router::new().route(
        "/completion",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "loading model") }),
    );
    let endpoint = spawn(router).await;
    let adapter = LlamaServerAdapter::new(ModelRole::Dialogue, config_for(&endpoint)).unwrap();

    let err = adapter
        .generate(&context("x", SamplingHint::Balanced))
        .await
        .unwrap_err();
    assert!(err.is_model_unavailable());
}

#[tokio::test]
async fn test_malformed_body_maps_to_generation_error() {
    let router = Router::new().route(
        "/completion",
        post(|| async { Json(json!({ "unexpected": true })) }),
    );
    let endpoint = spawn(router).await;
    let adapter = LlamaServerAdapter::new(ModelRole::Code, config_for(&endpoint)).unwrap();

    let err = adapter
        .generate(&context("x", SamplingHint::Balanced))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "generation_error");
}

#[tokio::test]
async fn test_connection_refused_maps_to_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter =
        LlamaServerAdapter::new(ModelRole::Code, config_for(&format!("http://{}", addr))).unwrap();

    let err = adapter
        .generate(&context("x", SamplingHint::Balanced))
        .await
        .unwrap_err();
    assert!(err.is_model_unavailable());
    assert!(!adapter.is_ready().await);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_probe() {
    let (endpoint, _fake) = healthy_server().await;
    let adapter = LlamaServerAdapter::new(ModelRole::Dialogue, config_for(&endpoint)).unwrap();
    assert!(adapter.is_ready().await);
}

#[tokio::test]
async fn test_health_probe_loading() {
    let router = Router::new().route(
        "/health",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "loading model" }))) }),
    );
    let endpoint = spawn(router).await;
    let adapter = LlamaServerAdapter::new(ModelRole::Dialogue, config_for(&endpoint)).unwrap();
    assert!(!adapter.is_ready().await);
}
