//! Generative-AI proxy error types.

use thiserror::Error;

/// Errors from the generative-AI proxy.
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key configured; the proxy cannot serve requests.
    #[error("Generative AI is not configured: missing API key")]
    MissingApiKey,

    /// The request carried neither a prompt nor an image.
    #[error("Request must include a prompt or an image")]
    EmptyRequest,

    /// The AI API answered with an error status.
    #[error("AI API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 200 but produced no usable text.
    #[error("AI response contained no text")]
    EmptyResponse,

    /// Transport-level failure reaching the API.
    #[error("AI network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AiError {
    /// Whether the caller sent a bad request, as opposed to the proxy or the
    /// upstream API failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AiError::EmptyRequest)
    }
}
