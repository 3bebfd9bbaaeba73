//! Configuration parsing and validation for mailbridge.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    pub genai: GenAiConfig,
    pub crm: Option<CrmConfig>,
    pub webhooks: Option<WebhookConfig>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:5000")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Browser origin allowed by CORS. Permissive when absent.
    pub allowed_origin: Option<String>,
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            allowed_origin: None,
        }
    }
}

/// Mail provider (Microsoft Graph) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base_url(),
        }
    }
}

/// Generative-text service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GenAiConfig {
    #[serde(default = "default_genai_base_url")]
    pub base_url: String,
    #[serde(default = "default_genai_model")]
    pub model: String,
    /// API key. May be a literal, a `${VAR}` reference, or absent in the file
    /// (resolved from MAILBRIDGE_GENAI_API_KEY by convention).
    pub api_key: Option<ApiKey>,
}

fn default_genai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_genai_model() -> String {
    "gemini-1.5-flash".to_string()
}

/// CRM (Salesforce-style) configuration. Optional; CRM endpoints fail with a
/// server error when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    /// OAuth password-grant token endpoint.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: ApiKey,
    pub username: String,
    pub password: ApiKey,
    #[serde(default = "default_crm_api_version")]
    pub api_version: String,
}

fn default_crm_api_version() -> String {
    "v59.0".to_string()
}

/// Webhook configuration used when constructing subscription payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Publicly reachable URL the mail provider posts change notifications to.
    pub notification_url: String,
}

/// Secret wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a secret config value was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Value was a literal string in config (no ${} references)
    Literal,
    /// Value contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Value was auto-discovered from a convention env var (holds var name)
    Convention(String),
    /// No value available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.is_empty() {
            return Err(ConfigError::Validation(
                "server.listen must not be empty".to_string(),
            ));
        }

        if self.genai.api_key.is_none() {
            return Err(ConfigError::Validation(
                "genai.api_key is required (set it in config, via ${VAR}, or via \
                 MAILBRIDGE_GENAI_API_KEY)"
                    .to_string(),
            ));
        }

        if let Some(crm) = &self.crm {
            if crm.token_url.is_empty() {
                return Err(ConfigError::Validation(
                    "crm.token_url must not be empty".to_string(),
                ));
            }
        } else {
            tracing::warn!("No [crm] section configured - CRM lookup endpoint will fail");
        }

        if let Some(webhooks) = &self.webhooks {
            if webhooks.notification_url.is_empty() {
                return Err(ConfigError::Validation(
                    "webhooks.notification_url must not be empty".to_string(),
                ));
            }
        } else {
            tracing::warn!(
                "No [webhooks] section configured - subscription creation will fail"
            );
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },
}

/// Raw generative-text config deserialized directly from TOML.
/// api_key is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
struct RawGenAiConfig {
    #[serde(default = "default_genai_base_url")]
    base_url: String,
    #[serde(default = "default_genai_model")]
    model: String,
    api_key: Option<String>,
}

/// Raw CRM config with unexpanded secret fields.
#[derive(Deserialize)]
struct RawCrmConfig {
    token_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    #[serde(default = "default_crm_api_version")]
    api_version: String,
}

/// Raw configuration deserialized directly from TOML.
/// Secret values may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    graph: GraphConfig,
    genai: RawGenAiConfig,
    crm: Option<RawCrmConfig>,
    webhooks: Option<WebhookConfig>,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// The closure-based design makes this testable without touching global env state.
/// Supports multiple `${VAR}` in one string. Fails on first missing variable,
/// unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            field: field.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                field: field.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            field: field.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in '{}')",
                var_name, field
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references in a string using real environment variables.
fn expand_env_vars(input: &str, field: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, field, |name| std::env::var(name).ok())
}

/// Convention env var holding the generation-API key when the config omits it.
pub const GENAI_KEY_ENV_VAR: &str = "MAILBRIDGE_GENAI_API_KEY";

/// Resolve one secret slot: expand `${VAR}` references or wrap the literal.
fn resolve_secret(raw: &str, field: &str) -> Result<(ApiKey, KeySource), ConfigError> {
    if raw.contains("${") {
        let expanded = expand_env_vars(raw, field)?;
        Ok((ApiKey::from(expanded), KeySource::EnvExpanded))
    } else {
        Ok((ApiKey::from(raw), KeySource::Literal))
    }
}

impl Config {
    /// Convert raw (deserialized) config to final config with env var expansion.
    ///
    /// Secret slots (`genai.api_key`, `crm.client_secret`, `crm.password`):
    /// - `${VAR}` references are expanded from the environment
    /// - literals are wrapped directly
    /// - an absent `genai.api_key` falls back to MAILBRIDGE_GENAI_API_KEY
    pub fn from_raw(raw: RawConfig) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut key_sources = Vec::new();

        let genai_key = match raw.genai.api_key {
            Some(ref raw_key) => {
                let (key, source) = resolve_secret(raw_key, "genai.api_key")?;
                key_sources.push(("genai.api_key".to_string(), source));
                Some(key)
            }
            None => match std::env::var(GENAI_KEY_ENV_VAR).ok() {
                Some(value) => {
                    key_sources.push((
                        "genai.api_key".to_string(),
                        KeySource::Convention(GENAI_KEY_ENV_VAR.to_string()),
                    ));
                    Some(ApiKey::from(value))
                }
                None => {
                    key_sources.push(("genai.api_key".to_string(), KeySource::None));
                    None
                }
            },
        };

        let crm = match raw.crm {
            Some(rc) => {
                let (client_secret, secret_source) =
                    resolve_secret(&rc.client_secret, "crm.client_secret")?;
                key_sources.push(("crm.client_secret".to_string(), secret_source));

                let (password, password_source) = resolve_secret(&rc.password, "crm.password")?;
                key_sources.push(("crm.password".to_string(), password_source));

                Some(CrmConfig {
                    token_url: rc.token_url,
                    client_id: rc.client_id,
                    client_secret,
                    username: rc.username,
                    password,
                    api_version: rc.api_version,
                })
            }
            None => None,
        };

        let config = Config {
            server: raw.server,
            graph: raw.graph,
            genai: GenAiConfig {
                base_url: raw.genai.base_url,
                model: raw.genai.model,
                api_key: genai_key,
            },
            crm,
            webhooks: raw.webhooks,
        };

        Ok((config, key_sources))
    }

    /// Load configuration from a TOML file with environment variable expansion.
    ///
    /// This is the env-var-aware entry point. It:
    /// 1. Reads the file
    /// 2. Parses as `RawConfig` (secrets as plain String)
    /// 3. Expands `${VAR}` references and applies the convention lookup
    /// 4. Validates the resulting config
    ///
    /// Returns the config and per-slot key source information.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        let raw: RawConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        let (config, key_sources) = Self::from_raw(raw)?;
        config.validate()?;

        Ok((config, key_sources))
    }
}
