//! Change-notification subscription handlers: create, renew, delete.
//!
//! Renewal is on-demand; there is no scheduled job.

use axum::{extract::State, Json};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::server::AppState;
use super::types::{require_field, require_token, SubscriptionRequest, TokenRequest};
use crate::error::{Error, Result};

/// Subscription lifetime in minutes. Graph caps message subscriptions just
/// above this value.
const SUBSCRIPTION_LIFETIME_MINUTES: i64 = 4230;

/// Expiration timestamp for a subscription created or renewed now.
fn expiration() -> String {
    (Utc::now() + Duration::minutes(SUBSCRIPTION_LIFETIME_MINUTES))
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Handle POST /api/subscriptions/create
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<Value>> {
    let token = request.require_token()?;

    let webhooks = state.config.webhooks.as_ref().ok_or_else(|| {
        Error::Internal("webhook notification URL is not configured".to_string())
    })?;

    let payload = json!({
        "changeType": "created",
        "notificationUrl": webhooks.notification_url,
        "resource": "me/mailFolders('Inbox')/messages",
        "expirationDateTime": expiration(),
        "clientState": Uuid::new_v4().to_string(),
    });

    let subscription = state.graph.create_subscription(token, &payload).await?;

    tracing::info!("Subscription created");
    Ok(Json(json!({ "subscription": subscription })))
}

/// Handle POST /api/subscriptions/renew
pub async fn renew(
    State(state): State<AppState>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let id = require_field(
        request.subscription_id.as_deref(),
        "Subscription ID is required",
    )?;

    let payload = json!({ "expirationDateTime": expiration() });
    let subscription = state.graph.renew_subscription(token, id, &payload).await?;

    Ok(Json(json!({ "subscription": subscription })))
}

/// Handle POST /api/subscriptions/delete
pub async fn remove(
    State(state): State<AppState>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let id = require_field(
        request.subscription_id.as_deref(),
        "Subscription ID is required",
    )?;

    state.graph.delete_subscription(token, id).await?;

    Ok(Json(json!({ "message": "Subscription deleted successfully" })))
}
