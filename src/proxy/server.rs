//! HTTP server setup and configuration.

use axum::http::HeaderValue;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::{assist, crm, folders, mail, subscriptions};
use crate::config::Config;
use crate::upstream::{CrmClient, GenAiClient, GraphClient};

/// Shared application state. Every client is constructed once during process
/// initialization and thereafter only read.
#[derive(Clone)]
pub struct AppState {
    pub graph: GraphClient,
    pub genai: GenAiClient,
    pub crm: Option<CrmClient>,
    pub config: Arc<Config>,
}

/// Per-request correlation ID, assigned by middleware.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Assign a correlation ID to the request and echo it in the response.
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = match state.config.server.allowed_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid allowed_origin, falling back to permissive CORS");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    };

    Router::new()
        // Mail provider pass-through
        .route("/api/emails", post(mail::fetch_emails))
        .route("/api/sendEmail", post(mail::send_email))
        .route("/api/attachments", post(mail::fetch_attachments))
        .route("/api/markAsRead", post(mail::mark_as_read))
        // Folders
        .route("/api/folders", post(folders::list_folders))
        .route("/api/folders/create", post(folders::create_folder))
        .route("/api/folders/rename", post(folders::rename_folder))
        .route("/api/folders/delete", post(folders::delete_folder))
        // AI assistance
        .route("/api/summarize", post(assist::summarize))
        .route("/api/summarize/stream", post(assist::summarize_stream))
        .route("/api/compose", post(assist::compose))
        .route("/api/sentiment", post(assist::analyze_sentiment))
        .route("/translate", post(assist::translate))
        // CRM
        .route("/api/crm/lookup", post(crm::lookup))
        // Change-notification subscriptions
        .route("/api/subscriptions/create", post(subscriptions::create))
        .route("/api/subscriptions/renew", post(subscriptions::renew))
        .route("/api/subscriptions/delete", post(subscriptions::remove))
        // Liveness
        .route("/health", get(health))
        // State and middleware
        .with_state(state)
        .layer(middleware::from_fn(assign_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    // One shared HTTP client; the generous timeout covers streamed generation.
    let http = Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let api_key = config
        .genai
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("genai.api_key missing after validation"))?;

    let state = AppState {
        graph: GraphClient::new(http.clone(), config.graph.base_url.clone()),
        genai: GenAiClient::new(
            http.clone(),
            config.genai.base_url.clone(),
            config.genai.model.clone(),
            api_key,
        ),
        crm: config.crm.clone().map(|c| CrmClient::new(http, c)),
        config: Arc::new(config),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting mailbridge server");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mailbridge"
    }))
}
