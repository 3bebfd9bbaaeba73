//! CRM lookup handler.

use axum::{extract::State, Json};
use serde_json::Value;

use super::server::AppState;
use super::types::CrmLookupRequest;
use crate::error::{Error, Result};

/// Handle POST /api/crm/lookup
///
/// Looks up the contact by email and/or the mentioned products, whichever the
/// request provides. The CRM payloads are returned opaquely.
pub async fn lookup(
    State(state): State<AppState>,
    Json(request): Json<CrmLookupRequest>,
) -> Result<Json<Value>> {
    let crm = state
        .crm
        .as_ref()
        .ok_or_else(|| Error::Crm("CRM integration is not configured".to_string()))?;

    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let products: Vec<String> = request
        .products
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    if email.is_none() && products.is_empty() {
        return Err(Error::BadRequest(
            "An email or a product list is required".to_string(),
        ));
    }

    let mut result = serde_json::Map::new();

    if let Some(email) = email {
        result.insert("contact".to_string(), crm.lookup_by_email(email).await?);
    }

    if !products.is_empty() {
        result.insert("products".to_string(), crm.lookup_products(&products).await?);
    }

    Ok(Json(Value::Object(result)))
}
