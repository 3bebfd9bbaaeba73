//! Integration tests for the AI streaming relay.
//!
//! Verifies that:
//! - SSE chunks are relayed in upstream order and their concatenation equals
//!   the upstream's full output
//! - The compose endpoint streams raw text whose body equals the upstream text
//! - A pre-stream upstream failure still surfaces as a normal 500

use std::sync::Arc;

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailbridge::config::{ApiKey, Config, GenAiConfig, GraphConfig, ServerConfig};
use mailbridge::proxy::{create_router, AppState};
use mailbridge::upstream::{GenAiClient, GraphClient};

fn test_app(genai_url: &str) -> axum::Router {
    let config = Config {
        server: ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            allowed_origin: None,
        },
        graph: GraphConfig {
            base_url: "http://127.0.0.1:1/v1.0".to_string(),
        },
        genai: GenAiConfig {
            base_url: genai_url.to_string(),
            model: "test-model".to_string(),
            api_key: Some(ApiKey::from("test-key")),
        },
        crm: None,
        webhooks: None,
    };

    let http = reqwest::Client::new();
    let state = AppState {
        graph: GraphClient::new(http.clone(), config.graph.base_url.clone()),
        genai: GenAiClient::new(
            http,
            genai_url.to_string(),
            "test-model".to_string(),
            ApiKey::from("test-key"),
        ),
        crm: None,
        config: Arc::new(config),
    };
    create_router(state)
}

/// Upstream SSE body carrying the given texts, one event per chunk.
fn sse_body(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|text| {
            format!(
                "data: {}\n\n",
                serde_json::json!({
                    "candidates": [{ "content": { "parts": [{ "text": text }] } }]
                })
            )
        })
        .collect()
}

async fn mount_stream(server: &MockServer, texts: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/models/test-model:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(texts), "text/event-stream"),
        )
        .mount(server)
        .await;
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> http::Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn summarize_stream_relays_chunks_in_order() {
    let genai = MockServer::start().await;
    mount_stream(&genai, &["Hel", "lo ", "world"]).await;

    let app = test_app(&genai.uri());
    let response = post_json(
        app,
        "/api/summarize/stream",
        serde_json::json!({ "body": "some long email" }),
    )
    .await;

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");

    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(body, "data: Hel\n\ndata: lo \n\ndata: world\n\n");

    // Concatenation of relayed chunks equals the upstream's full output
    let reassembled: String = body
        .split("\n\n")
        .filter(|event| !event.is_empty())
        .map(|event| event.strip_prefix("data: ").unwrap_or(event))
        .collect();
    assert_eq!(reassembled, "Hello world");
}

#[tokio::test]
async fn compose_streams_raw_text() {
    let genai = MockServer::start().await;
    mount_stream(&genai, &["Dear team,", " please find", " the update."]).await;

    let app = test_app(&genai.uri());
    let response = post_json(
        app,
        "/api/compose",
        serde_json::json!({ "subject": "Update", "body": "status notes" }),
    )
    .await;

    assert_eq!(response.status(), http::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(body, "Dear team, please find the update.");
}

#[tokio::test]
async fn stream_upstream_rejection_is_plain_500() {
    let genai = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota details"))
        .mount(&genai)
        .await;

    let app = test_app(&genai.uri());
    let response = post_json(
        app,
        "/api/summarize/stream",
        serde_json::json!({ "body": "some email" }),
    )
    .await;

    // The failure happened before any chunk was sent, so the status is usable
    assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!body.contains("quota details"), "upstream payload must not leak");
}

#[tokio::test]
async fn summarize_blocking_returns_summary() {
    let genai = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "Short summary." }] } }]
        })))
        .mount(&genai)
        .await;

    let app = test_app(&genai.uri());
    let response = post_json(
        app,
        "/api/summarize",
        serde_json::json!({ "body": "a very long email body" }),
    )
    .await;

    assert_eq!(response.status(), http::StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["summary"], "Short summary.");
}

#[tokio::test]
async fn sentiment_returns_structured_judgment() {
    let genai = MockServer::start().await;

    let judgment = r#"{"priority":"High","urgency":"Immediate","sentiment":"Negative","category":"Complaint","impact":"Churn risk","products":["Widget Pro"]}"#;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": judgment }] } }]
        })))
        .mount(&genai)
        .await;

    let app = test_app(&genai.uri());
    let response = post_json(
        app,
        "/api/sentiment",
        serde_json::json!({
            "emailContent": "Your Widget Pro broke again. I want a refund.",
            "emailSubject": "Broken product"
        }),
    )
    .await;

    assert_eq!(response.status(), http::StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["priority"], "High");
    assert_eq!(json["sentiment"], "Negative");
    assert_eq!(json["products"][0], "Widget Pro");
}
