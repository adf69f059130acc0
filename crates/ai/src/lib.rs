//! Oxygen AI - generative-AI proxy client.
//!
//! The website's chat assistant and invoice extraction both go through the
//! backend's `/api/ai/generate` endpoint; this crate is the upstream half of
//! that proxy. It builds Gemini `generateContent` requests (text prompt,
//! optional inline image, optional system instruction) and reduces answers
//! to plain text.

pub mod error;
pub mod gemini;

pub use error::AiError;
pub use gemini::{
    ContentGenerator, GeminiClient, GenerateReply, GenerateRequest, InlineData, DEFAULT_MODEL,
};
