//! Integration tests for input validation.
//!
//! Verifies that:
//! - Missing bearer tokens yield 401 before any upstream call is attempted
//! - Missing required fields yield 400 before any upstream call is attempted
//! - The error body carries a human-readable message and nothing else

use std::sync::Arc;

use axum::body::Body;
use http::Request;
use tower::ServiceExt;
use wiremock::MockServer;

use mailbridge::config::{ApiKey, Config, GenAiConfig, GraphConfig, ServerConfig};
use mailbridge::proxy::{create_router, AppState};
use mailbridge::upstream::{GenAiClient, GraphClient};

fn test_app(graph_url: &str, genai_url: &str) -> axum::Router {
    let config = Config {
        server: ServerConfig {
            listen: "127.0.0.1:0".to_string(),
            allowed_origin: None,
        },
        graph: GraphConfig {
            base_url: graph_url.to_string(),
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
        graph: GraphClient::new(http.clone(), graph_url.to_string()),
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

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (http::StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
    (status, json)
}

#[tokio::test]
async fn missing_token_yields_401_without_upstream_call() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    for uri in [
        "/api/emails",
        "/api/folders",
        "/api/attachments",
        "/api/markAsRead",
        "/api/subscriptions/create",
    ] {
        let (status, json) = post_json(app.clone(), uri, serde_json::json!({})).await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED, "uri: {}", uri);
        assert_eq!(json["message"], "Access token is required", "uri: {}", uri);
    }

    assert!(
        graph.received_requests().await.unwrap().is_empty(),
        "no Graph call may be attempted without a token"
    );
}

#[tokio::test]
async fn blank_token_yields_401() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    let (status, _) = post_json(
        app,
        "/api/emails",
        serde_json::json!({ "accessToken": "   " }),
    )
    .await;
    assert_eq!(status, http::StatusCode::UNAUTHORIZED);
    assert!(graph.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_prompt_yields_400_without_generation_call() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "body": "" }),
        serde_json::json!({ "body": "   " }),
    ] {
        let (status, json) = post_json(app.clone(), "/api/summarize", body).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid email content provided");

        let (status, _) = post_json(
            app.clone(),
            "/api/summarize/stream",
            serde_json::json!({ "body": "" }),
        )
        .await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
    }

    assert!(
        genai.received_requests().await.unwrap().is_empty(),
        "no generation call may be attempted for an empty prompt"
    );
}

#[tokio::test]
async fn translate_requires_all_three_fields() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    let (status, json) = post_json(
        app.clone(),
        "/translate",
        serde_json::json!({ "text": "Hello", "sourceLanguage": "en" }),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "Text, sourceLanguage, and targetLanguage are required"
    );
    assert!(genai.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn send_email_validates_token_before_fields() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    // No token at all: 401 wins even though fields are also missing
    let (status, _) = post_json(app.clone(), "/api/sendEmail", serde_json::json!({})).await;
    assert_eq!(status, http::StatusCode::UNAUTHORIZED);

    // Token present, fields missing: 400
    let (status, json) = post_json(
        app,
        "/api/sendEmail",
        serde_json::json!({ "accessToken": "tok", "subject": "Hi" }),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Subject, body, and recipients are required");

    assert!(graph.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn sentiment_requires_content() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    let (status, _) = post_json(
        app,
        "/api/sentiment",
        serde_json::json!({ "emailSubject": "only a subject" }),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert!(genai.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn compose_requires_subject_or_body() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    let (status, _) = post_json(
        app,
        "/api/compose",
        serde_json::json!({ "subject": " ", "body": "" }),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert!(genai.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn crm_lookup_without_configuration_is_500() {
    let graph = MockServer::start().await;
    let genai = MockServer::start().await;
    let app = test_app(&graph.uri(), &genai.uri());

    let (status, _) = post_json(
        app,
        "/api/crm/lookup",
        serde_json::json!({ "email": "user@example.test" }),
    )
    .await;
    assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
}
