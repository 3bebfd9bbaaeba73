//! Client for the CRM (Salesforce-style) REST API.
//!
//! The CRM is reached through a per-request session: a password-grant login
//! returning an access token and instance URL, followed by a SOQL query.
//! Nothing is cached between requests.

use reqwest::Client;
use serde_json::Value;

use crate::config::CrmConfig;
use crate::error::{Error, Result};

/// Client handle for the CRM API. Cloneable; constructed once at startup.
#[derive(Clone)]
pub struct CrmClient {
    http: Client,
    config: CrmConfig,
}

/// One short-lived login session.
struct CrmSession {
    access_token: String,
    instance_url: String,
}

impl CrmClient {
    pub fn new(http: Client, config: CrmConfig) -> Self {
        Self { http, config }
    }

    async fn login(&self) -> Result<CrmSession> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.expose_secret()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach CRM login endpoint");
                Error::Crm("login failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "CRM login rejected");
            return Err(Error::Crm("login failed".to_string()));
        }

        let payload: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "CRM login response was not valid JSON");
            Error::Crm("login failed".to_string())
        })?;

        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Crm("login failed".to_string()))?
            .to_string();
        let instance_url = payload
            .get("instance_url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Crm("login failed".to_string()))?
            .to_string();

        Ok(CrmSession {
            access_token,
            instance_url,
        })
    }

    async fn query(&self, session: &CrmSession, soql: &str) -> Result<Value> {
        let url = format!(
            "{}/services/data/{}/query",
            session.instance_url.trim_end_matches('/'),
            self.config.api_version
        );

        let response = self
            .http
            .get(url)
            .bearer_auth(&session.access_token)
            .query(&[("q", soql)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach CRM query endpoint");
                Error::Crm("query failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "CRM query rejected");
            return Err(Error::Crm("query failed".to_string()));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "CRM query response was not valid JSON");
            Error::Crm("query failed".to_string())
        })
    }

    /// Contact records matching the given email address.
    pub async fn lookup_by_email(&self, email: &str) -> Result<Value> {
        let session = self.login().await?;
        self.query(&session, &contact_soql(email)).await
    }

    /// Product records matching any of the given product names.
    pub async fn lookup_products(&self, names: &[String]) -> Result<Value> {
        let session = self.login().await?;
        self.query(&session, &products_soql(names)).await
    }
}

/// Escape a value for embedding in a SOQL string literal.
fn soql_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn contact_soql(email: &str) -> String {
    format!(
        "SELECT Id, Name, Email, Account.Name FROM Contact WHERE Email = '{}'",
        soql_quote(email)
    )
}

fn products_soql(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", soql_quote(n))).collect();
    format!(
        "SELECT Id, Name, ProductCode FROM Product2 WHERE Name IN ({})",
        quoted.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soql_quote_escapes_single_quotes() {
        assert_eq!(soql_quote("O'Brien"), "O\\'Brien");
    }

    #[test]
    fn test_soql_quote_escapes_backslashes() {
        assert_eq!(soql_quote("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_contact_soql_embeds_email() {
        let soql = contact_soql("user@example.test");
        assert!(soql.contains("Email = 'user@example.test'"));
    }

    #[test]
    fn test_products_soql_joins_names() {
        let soql = products_soql(&["Widget".to_string(), "Gadget".to_string()]);
        assert!(soql.contains("('Widget', 'Gadget')"));
    }
}
