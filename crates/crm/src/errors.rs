//! Error types for the Salesforce CRM crate.

use thiserror::Error;

/// Errors that can occur while talking to Salesforce.
///
/// Variants distinguish configuration problems (fix the environment),
/// authentication problems (fix the connected app or credentials), and
/// API-level failures (inspect the Salesforce response).
#[derive(Error, Debug)]
pub enum CrmError {
    /// Required credentials are absent from the environment.
    /// Lists the variable names that must be set before any call can succeed.
    #[error("Missing Salesforce credentials: {}", missing.join(", "))]
    MissingCredentials {
        /// Environment variable names that were empty or unset
        missing: Vec<String>,
    },

    /// The OAuth token endpoint rejected the credential exchange.
    #[error("Salesforce authentication failed ({status}): {message}")]
    AuthFailed {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Error body from the token endpoint, typically `error_description`
        message: String,
    },

    /// A REST call returned a non-success status.
    #[error("Salesforce API error ({status}): {message}")]
    Api {
        /// HTTP status of the failed call
        status: u16,
        /// First error message from the response body, or the raw body
        message: String,
    },

    /// The SOAP endpoint returned a fault or an envelope we could not read.
    #[error("Salesforce SOAP error: {0}")]
    Soap(String),

    /// A record create that the caller depends on did not produce an id.
    #[error("Failed to create {sobject}: {message}")]
    RecordCreateFailed {
        /// API name of the sObject being created
        sobject: String,
        /// Error detail from Salesforce
        message: String,
    },

    /// The response parsed, but did not have the shape we rely on.
    #[error("Unexpected Salesforce response: {0}")]
    UnexpectedResponse(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A network error occurred before Salesforce produced a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl CrmError {
    /// True when re-authenticating could let the operation succeed.
    ///
    /// Salesforce reports expired or revoked sessions as a 401, and the
    /// SOAP endpoint reports them as an `INVALID_SESSION_ID` fault.
    pub fn is_session_invalid(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 401,
            Self::Soap(message) => message.contains("INVALID_SESSION_ID"),
            Self::MissingCredentials { .. }
            | Self::AuthFailed { .. }
            | Self::RecordCreateFailed { .. }
            | Self::UnexpectedResponse(_)
            | Self::Json(_)
            | Self::Network(_) => false,
        }
    }
}
