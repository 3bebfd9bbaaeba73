//! Client for the generative-text service (Gemini-style REST API).
//!
//! Supports blocking generation (`:generateContent`) and incremental SSE
//! generation (`:streamGenerateContent?alt=sse`). Both paths return the text
//! of the first candidate; the rest of the upstream payload is opaque.

use futures::{future, stream, Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;

use super::sse::SseDecoder;
use crate::config::ApiKey;
use crate::error::{Error, Result};

/// Client handle for the generation API. Cloneable; constructed once at startup.
#[derive(Clone)]
pub struct GenAiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: ApiKey,
}

impl GenAiClient {
    pub fn new(http: Client, base_url: String, model: String, api_key: ApiKey) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    /// Build a request for the given generation verb. The API key travels in
    /// a header rather than the query string so it never appears in URLs.
    fn request(&self, verb: &str, sse: bool) -> reqwest::RequestBuilder {
        let mut url = format!("{}/models/{}:{}", self.base_url, self.model, verb);
        if sse {
            url.push_str("?alt=sse");
        }
        self.http
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
    }

    /// Generate the full response for a prompt in one blocking call.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .request("generateContent", false)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach generation service");
                Error::GenAi("generation service unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Generation service returned error");
            return Err(Error::GenAi(format!(
                "generation service returned {}",
                status
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse generation response");
            Error::GenAi("generation response was not valid JSON".to_string())
        })?;

        extract_text(&payload)
            .ok_or_else(|| Error::GenAi("generation response contained no text".to_string()))
    }

    /// Generate incrementally, yielding text chunks in upstream arrival order.
    ///
    /// The returned stream decodes the upstream SSE bytes line by line
    /// (reassembling lines across TCP chunk boundaries) and yields the text of
    /// each event. A transport error mid-stream surfaces as one `Err` item;
    /// nothing is retried once chunks have started flowing.
    pub async fn generate_stream(
        &self,
        prompt: &str,
    ) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
        let response = self
            .request("streamGenerateContent", true)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach generation service");
                Error::GenAi("generation service unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Generation service returned error");
            return Err(Error::GenAi(format!(
                "generation service returned {}",
                status
            )));
        }

        // A trailing None sentinel flushes any final line the upstream sent
        // without a terminating newline.
        let chunks = response
            .bytes_stream()
            .map(Some)
            .chain(stream::iter(std::iter::once(None)))
            .scan(SseDecoder::new(), |decoder, item| {
                let out: Vec<Result<String>> = match item {
                    Some(Ok(bytes)) => decoder
                        .feed(&bytes)
                        .iter()
                        .filter_map(|payload| event_text(payload))
                        .map(Ok)
                        .collect(),
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Generation stream read failed");
                        vec![Err(Error::GenAi(
                            "generation stream ended unexpectedly".to_string(),
                        ))]
                    }
                    None => std::mem::take(decoder)
                        .finish()
                        .as_deref()
                        .and_then(event_text)
                        .map(Ok)
                        .into_iter()
                        .collect(),
                };
                future::ready(Some(stream::iter(out)))
            })
            .flatten();

        Ok(chunks)
    }
}

/// Request body shared by both generation modes.
fn request_body(prompt: &str) -> Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    })
}

/// Text carried by one SSE event payload. Unparseable payloads are skipped.
fn event_text(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    extract_text(&value)
}

/// Concatenated text of the first candidate's parts, or None when absent.
pub(crate) fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
