//! Message handlers: fetch (with folder-name enrichment), send, attachments,
//! and mark-as-read.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::server::AppState;
use super::types::{require_field, require_token, AttachmentsRequest, MarkAsReadRequest, SendEmailRequest, TokenRequest};
use crate::error::Result;

/// Sentinel folder name when a message's parent folder is not in the folder list.
const UNKNOWN_FOLDER: &str = "Unknown Folder";

/// Handle POST /api/emails
///
/// Fetches the caller's messages, then the folder list, and annotates each
/// message with the display name of its parent folder.
pub async fn fetch_emails(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<Value>> {
    let token = request.require_token()?;

    let mut emails = state.graph.list_messages(token).await?;
    let folders = state.graph.list_folders(token).await?;
    let folder_list = folders
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    resolve_folder_names(&mut emails, &folder_list);

    tracing::info!(count = emails.len(), "Fetched emails");
    Ok(Json(json!({ "emails": emails })))
}

/// Annotate each message with `folderName`: the display name of the folder
/// whose id matches the message's `parentFolderId`, or the sentinel when no
/// folder matches.
fn resolve_folder_names(emails: &mut [Value], folders: &[Value]) {
    let names: HashMap<&str, &str> = folders
        .iter()
        .filter_map(|folder| {
            Some((
                folder.get("id")?.as_str()?,
                folder.get("displayName")?.as_str()?,
            ))
        })
        .collect();

    for email in emails.iter_mut() {
        let name = email
            .get("parentFolderId")
            .and_then(Value::as_str)
            .and_then(|id| names.get(id).copied())
            .unwrap_or(UNKNOWN_FOLDER);

        if let Some(obj) = email.as_object_mut() {
            obj.insert("folderName".to_string(), Value::String(name.to_string()));
        }
    }
}

/// Handle POST /api/sendEmail
pub async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;

    let missing = "Subject, body, and recipients are required";
    let subject = require_field(request.subject.as_deref(), missing)?;
    let body = require_field(request.body.as_deref(), missing)?;
    let recipients = match request.recipients.as_deref() {
        Some(list) if !list.is_empty() => list,
        _ => return Err(crate::error::Error::BadRequest(missing.to_string())),
    };

    let mut message = json!({
        "subject": subject,
        "body": {
            "contentType": "Text",
            "content": body
        },
        "toRecipients": address_list(recipients),
    });

    if let Some(cc) = request.cc_recipients.as_deref().filter(|cc| !cc.is_empty()) {
        message["ccRecipients"] = address_list(cc);
    }

    state.graph.send_mail(token, &message).await?;

    tracing::info!(recipients = recipients.len(), "Email sent");
    Ok(Json(json!({ "message": "Email sent successfully" })))
}

/// Graph recipient objects for a list of plain addresses.
fn address_list(addresses: &[String]) -> Value {
    Value::Array(
        addresses
            .iter()
            .map(|address| json!({ "emailAddress": { "address": address } }))
            .collect(),
    )
}

/// Handle POST /api/attachments
///
/// An upstream fetch failure is a partial-success case: the caller gets an
/// empty attachment list rather than an error.
pub async fn fetch_attachments(
    State(state): State<AppState>,
    Json(request): Json<AttachmentsRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let email_id = require_field(request.email_id.as_deref(), "Email ID is required")?;

    let attachments = match state.graph.list_attachments(token, email_id).await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(error = %e, "Attachment fetch failed, returning empty set");
            Vec::new()
        }
    };

    Ok(Json(json!({ "attachments": attachments })))
}

/// Handle POST /api/markAsRead
pub async fn mark_as_read(
    State(state): State<AppState>,
    Json(request): Json<MarkAsReadRequest>,
) -> Result<Json<Value>> {
    let token = require_token(request.access_token.as_deref())?;
    let message_id = require_field(request.message_id.as_deref(), "Message ID is required")?;

    state.graph.mark_read(token, message_id).await?;

    Ok(Json(json!({ "message": "Email marked as read" })))
}
