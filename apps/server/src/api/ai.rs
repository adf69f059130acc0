//! Generative-AI proxy: forwards prompts to Gemini so the browser never
//! sees the API key.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use oxygen_ai::{AiError, GenerateReply, GenerateRequest};
use serde_json::Value;

use crate::api::parse_body;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<GenerateReply>> {
    let generator = state
        .generator
        .as_ref()
        .ok_or(ApiError::Ai(AiError::MissingApiKey))?;

    let request: GenerateRequest = parse_body(body)?;
    let reply = generator.generate(&request).await?;
    Ok(Json(reply))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ai/generate", post(generate))
}
