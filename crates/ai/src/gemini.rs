//! Thin client for the Gemini `generateContent` endpoint.
//!
//! The website never talks to Gemini directly: the backend proxies the call
//! so the API key stays server-side. This module is the upstream half of
//! that proxy. Request bodies are built here and answers are reduced to the
//! concatenated text parts of the first candidate; prompt engineering stays
//! with the caller.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AiError;

/// Upstream API root.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when neither the configuration nor the request names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Body of `POST /api/ai/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    /// Inline image, e.g. a photographed invoice.
    pub image: Option<InlineData>,
    /// Overrides the configured model for this request.
    pub model: Option<String>,
    pub system_instruction: Option<String>,
}

/// Base64 payload with its media type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// The extracted text answer.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReply {
    pub text: String,
}

/// Text-generation seam, so handlers can be tested without the live API.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply, AiError>;
}

/// [`ContentGenerator`] implementation over the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    default_model: String,
}

impl GeminiClient {
    /// Fails with [`AiError::MissingApiKey`] when no key is configured, so
    /// the server can boot without AI and reject AI requests instead of
    /// refusing to start.
    pub fn new(api_key: Option<String>, model: Option<String>) -> Result<Self, AiError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key,
            default_model: model
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn model_for<'a>(&'a self, request: &'a GenerateRequest) -> &'a str {
        request
            .model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(&self.default_model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply, AiError> {
        let model = self.model_for(request);
        let body = generation_body(request)?;
        let url = format!("{GEMINI_BASE_URL}/models/{model}:generateContent");
        debug!("[Gemini] generateContent via {model}");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let payload = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &payload));
        }
        let document: Value =
            serde_json::from_str(&payload).map_err(|_| AiError::EmptyResponse)?;
        let text = extract_text(&document).ok_or(AiError::EmptyResponse)?;
        Ok(GenerateReply { text })
    }
}

/// Builds the `generateContent` body from a proxy request.
fn generation_body(request: &GenerateRequest) -> Result<Value, AiError> {
    let mut parts = Vec::new();
    if let Some(prompt) = request.prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        parts.push(json!({ "text": prompt }));
    }
    if let Some(image) = &request.image {
        parts.push(json!({
            "inline_data": { "mime_type": image.mime_type, "data": image.data }
        }));
    }
    if parts.is_empty() {
        return Err(AiError::EmptyRequest);
    }

    let mut body = json!({ "contents": [{ "parts": parts }] });
    if let Some(instruction) = request
        .system_instruction
        .as_deref()
        .filter(|instruction| !instruction.trim().is_empty())
    {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    Ok(body)
}

/// Concatenated text parts of the first candidate, if any.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(text).filter(|text| !text.is_empty())
}

/// Maps a non-2xx answer (`{"error": {"message", ...}}`) to [`AiError::Api`].
fn api_error(status: u16, body: &str) -> AiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|document| {
            document
                .get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    AiError::Api { status, message }
}
