//! Error type shared by all handlers, mapped onto the wire shape the
//! website expects: `{ "success": false, "error": "…" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oxygen_ai::AiError;
use oxygen_crm::CrmError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// A Salesforce operation failed.
    #[error(transparent)]
    Crm(#[from] CrmError),

    /// The generative-AI call failed or the proxy is unconfigured.
    #[error(transparent)]
    Ai(#[from] AiError),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            // Salesforce failures all surface as 500: the caller cannot
            // usefully distinguish credential, auth and API errors, and the
            // detail is in the message.
            ApiError::Crm(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Ai(AiError::MissingApiKey) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            ApiError::Ai(err) if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Ai(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
        };
        let body = ErrorBody {
            success: false,
            error,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_maps_to_400() {
        let response = ApiError::BadRequest("Company name is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_crm_errors_map_to_500() {
        let error = ApiError::Crm(CrmError::Api {
            status: 400,
            message: "REQUIRED_FIELD_MISSING".to_string(),
        });
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unconfigured_ai_maps_to_503() {
        let response = ApiError::Ai(AiError::MissingApiKey).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_empty_ai_request_maps_to_400() {
        let response = ApiError::Ai(AiError::EmptyRequest).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_ai_failure_maps_to_502() {
        let error = ApiError::Ai(AiError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        });
        assert_eq!(error.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
