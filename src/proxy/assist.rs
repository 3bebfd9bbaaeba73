//! AI-assisted handlers: summarize (blocking and streamed), translate,
//! compose (streamed), and sentiment analysis.

use axum::response::Response;
use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use super::relay;
use super::server::{AppState, RequestId};
use super::types::{require_field, ComposeRequest, SentimentRequest, SentimentResult, SummarizeRequest, TranslateRequest};
use crate::error::{Error, Result};

/// Handle POST /api/summarize
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<Value>> {
    let body = require_field(request.body.as_deref(), "Invalid email content provided")?;

    let summary = state.genai.generate(&summary_prompt(body)).await?;

    Ok(Json(json!({ "summary": summary })))
}

/// Handle POST /api/summarize/stream
///
/// Same prompt as the blocking variant, relayed chunk by chunk over SSE.
pub async fn summarize_stream(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Response> {
    let body = require_field(request.body.as_deref(), "Invalid email content provided")?;

    let chunks = state.genai.generate_stream(&summary_prompt(body)).await?;

    tracing::info!(request_id = %request_id.0, "Starting summary stream");
    Ok(relay::sse_response(chunks))
}

/// Handle POST /translate
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<Value>> {
    let missing = "Text, sourceLanguage, and targetLanguage are required";
    let text = require_field(request.text.as_deref(), missing)?;
    let source = require_field(request.source_language.as_deref(), missing)?;
    let target = require_field(request.target_language.as_deref(), missing)?;

    let result = state
        .genai
        .generate(&translation_prompt(text, source, target))
        .await?;

    Ok(Json(json!({ "result": result })))
}

/// Handle POST /api/compose
///
/// Streams the drafted email as raw text; the browser renders it as it grows.
pub async fn compose(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ComposeRequest>,
) -> Result<Response> {
    let subject = request.subject.as_deref().unwrap_or("").trim();
    let body = request.body.as_deref().unwrap_or("").trim();
    if subject.is_empty() && body.is_empty() {
        return Err(Error::BadRequest(
            "A subject or draft notes are required".to_string(),
        ));
    }

    let chunks = state
        .genai
        .generate_stream(&compose_prompt(subject, body))
        .await?;

    tracing::info!(request_id = %request_id.0, "Starting compose stream");
    Ok(relay::text_response(chunks))
}

/// Handle POST /api/sentiment
pub async fn analyze_sentiment(
    State(state): State<AppState>,
    Json(request): Json<SentimentRequest>,
) -> Result<Json<SentimentResult>> {
    let content = require_field(request.email_content.as_deref(), "Email content is required")?;
    let subject = request.email_subject.as_deref().unwrap_or("");

    let raw = state
        .genai
        .generate(&sentiment_prompt(subject, content))
        .await?;

    let result = parse_sentiment(&raw)?;
    Ok(Json(result))
}

fn summary_prompt(body: &str) -> String {
    format!(
        "Summarize the following email in the most concise way possible, focusing on \
         the key points such as the purpose of the email, any actions required, \
         deadlines, or important details. Adjust the length of the summary based on \
         the email's content; if the email is short, provide a proportionately brief \
         summary.\n\n{}",
        body
    )
}

fn translation_prompt(text: &str, source: &str, target: &str) -> String {
    format!(
        "Translate the following text from {} to {}: {}",
        source, target, text
    )
}

fn compose_prompt(subject: &str, body: &str) -> String {
    format!(
        "Write a complete, professional email. Use a friendly but businesslike tone \
         and keep it concise. Do not include a signature placeholder.\n\
         Subject: {}\nDraft notes: {}",
        subject, body
    )
}

fn sentiment_prompt(subject: &str, content: &str) -> String {
    format!(
        "Analyze the following customer email and respond with ONLY a JSON object, \
         no prose and no code fences, with exactly these keys: \
         \"priority\" (High, Medium, or Low), \
         \"urgency\" (Immediate, Soon, or Routine), \
         \"sentiment\" (Positive, Neutral, or Negative), \
         \"category\" (a short label such as Complaint, Inquiry, or Feedback), \
         \"impact\" (a short description of the business impact), \
         \"products\" (an array of product names mentioned, possibly empty).\n\
         Subject: {}\nEmail: {}",
        subject, content
    )
}

/// Parse the model's judgment output, tolerating code fences and surrounding
/// prose: the first `{` through the last `}` is treated as the JSON object.
fn parse_sentiment(raw: &str) -> Result<SentimentResult> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let candidate = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            tracing::error!(output = %raw, "Sentiment output contained no JSON object");
            return Err(Error::GenAi(
                "sentiment analysis returned an unreadable judgment".to_string(),
            ));
        }
    };

    serde_json::from_str(candidate).map_err(|e| {
        tracing::error!(error = %e, output = %raw, "Sentiment output was not valid JSON");
        Error::GenAi("sentiment analysis returned an unreadable judgment".to_string())
    })
}
