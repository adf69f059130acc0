use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::main_lib::AppState;

/// Liveness body; the website pings this before enabling the contact form.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Salesforce proxy server is running",
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
