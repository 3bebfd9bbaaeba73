//! Request and response types for the browser-facing JSON API.
//!
//! Field names are camelCase to match the browser client. Required fields are
//! `Option` so that presence can be validated with a 400 and a readable
//! message instead of a deserialization rejection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reject absent or blank bearer tokens before any upstream call.
pub fn require_token(token: Option<&str>) -> Result<&str> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(Error::MissingToken),
    }
}

/// Reject absent or blank required string fields.
pub fn require_field<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::BadRequest(message.to_string())),
    }
}

/// Body for endpoints that need only the caller's bearer token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub access_token: Option<String>,
}

impl TokenRequest {
    pub fn require_token(&self) -> Result<&str> {
        require_token(self.access_token.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub access_token: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub cc_recipients: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

/// Compose never touches the mail provider, so no token field; a token sent
/// by older clients is ignored like any other unknown field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest {
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRequest {
    pub email_content: Option<String>,
    pub email_subject: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmLookupRequest {
    pub email: Option<String>,
    pub products: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentsRequest {
    pub access_token: Option<String>,
    pub email_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub access_token: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub access_token: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFolderRequest {
    pub access_token: Option<String>,
    pub folder_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFolderRequest {
    pub access_token: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub access_token: Option<String>,
    pub subscription_id: Option<String>,
}

/// Structured judgment parsed from the model's sentiment output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResult {
    pub priority: String,
    pub urgency: String,
    pub sentiment: String,
    pub category: String,
    pub impact: String,
    #[serde(default)]
    pub products: Vec<String>,
}
