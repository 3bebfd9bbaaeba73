//! Client for the mail provider (Microsoft Graph) REST API.
//!
//! Every method takes the caller's bearer token; the proxy never acquires or
//! stores tokens itself. Upstream errors are logged in full and surfaced to
//! handlers as generic [`Error::Graph`] values.

use axum::http::header;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};

/// Client handle for the mail provider API. Cloneable; constructed once at startup.
#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Bearer {}", token))
    }

    /// Send a request and parse the JSON body, tolerating the empty bodies
    /// Graph returns for 202 (sendMail) and 204 (DELETE, PATCH).
    async fn execute(&self, request: RequestBuilder, action: &'static str) -> Result<Option<Value>> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, action, "Failed to reach mail provider");
            Error::Graph(format!("could not {}", action))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, action, "Mail provider returned error");
            return Err(Error::Graph(format!("could not {}", action)));
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::ACCEPTED {
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, action, "Failed to read mail provider response");
            Error::Graph(format!("could not {}", action))
        })?;

        if bytes.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            tracing::error!(error = %e, action, "Mail provider response was not valid JSON");
            Error::Graph(format!("could not {}", action))
        })
    }

    /// GET that must return a JSON body.
    async fn get_json(&self, token: &str, path: &str, action: &'static str) -> Result<Value> {
        self.execute(Self::bearer(self.http.get(self.url(path)), token), action)
            .await?
            .ok_or_else(|| Error::Graph(format!("could not {}", action)))
    }

    /// The caller's messages, newest first per Graph defaults.
    pub async fn list_messages(&self, token: &str) -> Result<Vec<Value>> {
        let payload = self.get_json(token, "/me/messages", "fetch messages").await?;
        Ok(value_array(&payload))
    }

    /// The full folder-list payload, including `@odata.context`.
    pub async fn list_folders(&self, token: &str) -> Result<Value> {
        self.get_json(token, "/me/mailFolders", "fetch folders").await
    }

    pub async fn send_mail(&self, token: &str, message: &Value) -> Result<()> {
        let request = Self::bearer(self.http.post(self.url("/me/sendMail")), token)
            .json(&serde_json::json!({ "message": message }));
        self.execute(request, "send email").await?;
        Ok(())
    }

    pub async fn list_attachments(&self, token: &str, message_id: &str) -> Result<Vec<Value>> {
        let path = format!("/me/messages/{}/attachments", message_id);
        let payload = self.get_json(token, &path, "fetch attachments").await?;
        Ok(value_array(&payload))
    }

    pub async fn mark_read(&self, token: &str, message_id: &str) -> Result<()> {
        let path = format!("/me/messages/{}", message_id);
        let request = Self::bearer(self.http.patch(self.url(&path)), token)
            .json(&serde_json::json!({ "isRead": true }));
        self.execute(request, "mark email as read").await?;
        Ok(())
    }

    pub async fn create_folder(&self, token: &str, display_name: &str) -> Result<()> {
        let request = Self::bearer(self.http.post(self.url("/me/mailFolders")), token)
            .json(&serde_json::json!({ "displayName": display_name }));
        self.execute(request, "create folder").await?;
        Ok(())
    }

    pub async fn rename_folder(&self, token: &str, folder_id: &str, display_name: &str) -> Result<()> {
        let path = format!("/me/mailFolders/{}", folder_id);
        let request = Self::bearer(self.http.patch(self.url(&path)), token)
            .json(&serde_json::json!({ "displayName": display_name }));
        self.execute(request, "rename folder").await?;
        Ok(())
    }

    pub async fn delete_folder(&self, token: &str, folder_id: &str) -> Result<()> {
        let path = format!("/me/mailFolders/{}", folder_id);
        let request = Self::bearer(self.http.delete(self.url(&path)), token);
        self.execute(request, "delete folder").await?;
        Ok(())
    }

    pub async fn create_subscription(&self, token: &str, payload: &Value) -> Result<Value> {
        let request =
            Self::bearer(self.http.post(self.url("/subscriptions")), token).json(payload);
        self.execute(request, "create subscription")
            .await?
            .ok_or_else(|| Error::Graph("could not create subscription".to_string()))
    }

    pub async fn renew_subscription(
        &self,
        token: &str,
        subscription_id: &str,
        payload: &Value,
    ) -> Result<Value> {
        let path = format!("/subscriptions/{}", subscription_id);
        let request = Self::bearer(self.http.patch(self.url(&path)), token).json(payload);
        self.execute(request, "renew subscription")
            .await?
            .ok_or_else(|| Error::Graph("could not renew subscription".to_string()))
    }

    pub async fn delete_subscription(&self, token: &str, subscription_id: &str) -> Result<()> {
        let path = format!("/subscriptions/{}", subscription_id);
        let request = Self::bearer(self.http.delete(self.url(&path)), token);
        self.execute(request, "delete subscription").await?;
        Ok(())
    }
}

/// The `value` array of a Graph collection payload, or empty when absent.
fn value_array(payload: &Value) -> Vec<Value> {
    payload
        .get("value")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
