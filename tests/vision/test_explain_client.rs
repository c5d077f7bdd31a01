// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Explanation client against a local OpenAI-compatible stand-in

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use scan_inference_node::{
    config::ExplanationConfig,
    scan::Label,
    vision::{ExplanationClient, ExplanationProvider},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Captured {
    auth: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<serde_json::Value>>>,
}

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn answering_server(content: serde_json::Value) -> (String, Captured) {
    let captured = Captured::default();
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                move |State(captured): State<Captured>,
                      headers: HeaderMap,
                      Json(body): Json<serde_json::Value>| {
                    let content = content.clone();
                    async move {
                        *captured.auth.lock().unwrap() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        *captured.body.lock().unwrap() = Some(body);
                        Json(serde_json::json!({
                            "choices": [{ "message": { "role": "assistant", "content": content } }]
                        }))
                    }
                },
            ),
        )
        .with_state(captured.clone());
    (spawn_server(router).await, captured)
}

#[tokio::test]
async fn test_explanation_returned_and_request_shaped() {
    let (base, captured) =
        answering_server(serde_json::json!("  This may be nits. Please see a professional.  "))
            .await;
    let client = ExplanationClient::new(&base, "sk-test").unwrap();

    let text = client.explain(Label::Nits, 0.85, "QUJD").await;

    assert_eq!(
        text.as_deref(),
        Some("This may be nits. Please see a professional.")
    );
    assert_eq!(
        captured.auth.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );

    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["max_tokens"], 200);
    let content = &body["messages"][0]["content"];
    assert!(content[0]["text"]
        .as_str()
        .unwrap()
        .contains("nits (confidence 85%)"));
    assert_eq!(
        content[1]["image_url"]["url"],
        "data:image/jpeg;base64,QUJD"
    );
}

#[tokio::test]
async fn test_server_error_collapses_to_none() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
    );
    let base = spawn_server(router).await;
    let client = ExplanationClient::new(&base, "sk-test").unwrap();

    assert!(client.explain(Label::Lice, 0.9, "QUJD").await.is_none());
}

#[tokio::test]
async fn test_empty_choices_collapse_to_none() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(serde_json::json!({ "choices": [] })) }),
    );
    let base = spawn_server(router).await;
    let client = ExplanationClient::new(&base, "sk-test").unwrap();

    assert!(client.explain(Label::Clear, 0.0, "QUJD").await.is_none());
}

#[tokio::test]
async fn test_blank_content_collapses_to_none() {
    let (base, _) = answering_server(serde_json::json!("   ")).await;
    let client = ExplanationClient::new(&base, "sk-test").unwrap();

    assert!(client.explain(Label::Dandruff, 0.5, "QUJD").await.is_none());
}

#[tokio::test]
async fn test_malformed_body_collapses_to_none() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { "not json at all" }),
    );
    let base = spawn_server(router).await;
    let client = ExplanationClient::new(&base, "sk-test").unwrap();

    assert!(client.explain(Label::Lice, 0.9, "QUJD").await.is_none());
}

#[tokio::test]
async fn test_slow_provider_times_out_to_none() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(serde_json::json!({ "choices": [] }))
        }),
    );
    let base = spawn_server(router).await;
    let client =
        ExplanationClient::with_timeout(&base, "sk-test", Duration::from_millis(100)).unwrap();

    assert!(client.explain(Label::Lice, 0.9, "QUJD").await.is_none());
}

#[test]
fn test_client_built_only_with_key() {
    let disabled = ExplanationClient::from_config(&ExplanationConfig::default()).unwrap();
    assert!(disabled.is_none());

    let enabled = ExplanationClient::from_config(&ExplanationConfig {
        api_key: Some("sk-test".to_string()),
        api_base: "http://127.0.0.1:9".to_string(),
    })
    .unwrap()
    .unwrap();
    assert_eq!(enabled.endpoint(), "http://127.0.0.1:9");
}
