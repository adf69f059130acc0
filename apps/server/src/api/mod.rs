//! HTTP surface: routing, CORS and request tracing.

pub mod ai;
pub mod health;
pub mod salesforce;

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ApiError;
use crate::main_lib::AppState;

/// Assembles the application router with all endpoints under `/api`.
pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let origin: HeaderValue = config.frontend_url.parse().unwrap();
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let api = Router::new()
        .merge(health::router())
        .merge(salesforce::router())
        .merge(ai::router());

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Deserializes a JSON body into a typed request, reporting shape problems
/// in the `{ success: false, error }` wire format rather than the framework
/// default.
pub(crate) fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|err| ApiError::BadRequest(err.to_string()))
}
