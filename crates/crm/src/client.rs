//! HTTP client for the Salesforce REST and SOAP APIs.
//!
//! Every operation the backend performs against Salesforce goes through the
//! [`SalesforceApi`] trait, so handlers and the conversion orchestrator can be
//! exercised against a mock. [`SalesforceClient`] is the real implementation;
//! it pulls a session from the injected [`SessionProvider`] on every call,
//! which is what makes an expired cache re-authenticate before the next
//! operation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::CrmError;
use crate::models::{ApiErrorBody, QueryResponse, SaveResult};
use crate::session::SessionProvider;
use crate::soap::{
    build_convert_envelope, parse_convert_response, ConvertLeadRequest, LeadConvertResult,
};

/// REST API version used for all data operations.
const API_VERSION: &str = "v59.0";

/// Partner SOAP endpoint, needed only for `convertLead`.
const SOAP_PATH: &str = "/services/Soap/u/59.0";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Operations the backend performs against Salesforce.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// Instance URL of the current session, for building deep links.
    async fn instance_url(&self) -> Result<String, CrmError>;

    /// Id of the authenticated user, when the token response carried one.
    /// Converted records are assigned to this user.
    async fn current_user_id(&self) -> Result<Option<String>, CrmError>;

    /// Runs a SOQL query and returns the raw result document
    /// (`{totalSize, done, records}`).
    async fn query(&self, soql: &str) -> Result<Value, CrmError>;

    /// Creates a record, returning the save result with the new id.
    async fn create_record(&self, sobject: &str, fields: Value) -> Result<SaveResult, CrmError>;

    /// Updates a record. Salesforce answers with an empty body on success.
    async fn update_record(&self, sobject: &str, id: &str, fields: Value)
        -> Result<(), CrmError>;

    /// Converts a Lead via the Partner SOAP API.
    async fn convert_lead(
        &self,
        request: &ConvertLeadRequest,
    ) -> Result<LeadConvertResult, CrmError>;
}

/// Escapes a string literal for embedding in a SOQL `WHERE` clause.
pub fn escape_soql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Deserializes a raw query document into typed rows.
pub fn parse_query<R: DeserializeOwned>(document: Value) -> Result<QueryResponse<R>, CrmError> {
    serde_json::from_value(document)
        .map_err(|e| CrmError::UnexpectedResponse(format!("query response: {e}")))
}

/// Creates a record and extracts the new id, folding Salesforce's
/// success-with-errors shape into [`CrmError::RecordCreateFailed`].
pub(crate) async fn create_record_id(
    api: &dyn SalesforceApi,
    sobject: &str,
    fields: Value,
) -> Result<String, CrmError> {
    let result = api.create_record(sobject, fields).await?;
    if !result.success {
        return Err(CrmError::RecordCreateFailed {
            sobject: sobject.to_string(),
            message: Value::Array(result.errors).to_string(),
        });
    }
    result
        .id
        .ok_or_else(|| CrmError::UnexpectedResponse(format!("{sobject} create returned no id")))
}

/// [`SalesforceApi`] implementation over HTTP.
pub struct SalesforceClient {
    http: reqwest::Client,
    sessions: Arc<dyn SessionProvider>,
}

impl SalesforceClient {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, sessions })
    }

    /// Sends a REST request and returns the parsed JSON body, or `None` for
    /// the empty responses Salesforce sends on PATCH.
    async fn rest_request(
        &self,
        method: Method,
        path: &str,
        query: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Result<Option<Value>, CrmError> {
        let session = self.sessions.session().await?;
        let mut url = reqwest::Url::parse(&format!(
            "{}/services/data/{}/{}",
            session.instance_url, API_VERSION, path
        ))
        .map_err(|e| CrmError::UnexpectedResponse(format!("invalid instance URL: {e}")))?;
        if let Some((name, value)) = query {
            url.query_pairs_mut().append_pair(name, value);
        }
        debug!("[Salesforce] {} {}", method, url.path());

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&session.access_token)
            .header("Sforce-Duplicate-Rule-Header", "allowSave=true");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        if !is_json || body.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| CrmError::UnexpectedResponse(format!("response body: {e}")))
    }
}

#[async_trait]
impl SalesforceApi for SalesforceClient {
    async fn instance_url(&self) -> Result<String, CrmError> {
        Ok(self.sessions.session().await?.instance_url)
    }

    async fn current_user_id(&self) -> Result<Option<String>, CrmError> {
        Ok(self.sessions.session().await?.user_id)
    }

    async fn query(&self, soql: &str) -> Result<Value, CrmError> {
        self.rest_request(Method::GET, "query", Some(("q", soql)), None)
            .await?
            .ok_or_else(|| CrmError::UnexpectedResponse("empty query response".to_string()))
    }

    async fn create_record(&self, sobject: &str, fields: Value) -> Result<SaveResult, CrmError> {
        let body = self
            .rest_request(Method::POST, &format!("sobjects/{sobject}"), None, Some(fields))
            .await?
            .ok_or_else(|| CrmError::UnexpectedResponse("empty create response".to_string()))?;
        serde_json::from_value(body)
            .map_err(|e| CrmError::UnexpectedResponse(format!("create response: {e}")))
    }

    async fn update_record(
        &self,
        sobject: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), CrmError> {
        self.rest_request(
            Method::PATCH,
            &format!("sobjects/{sobject}/{id}"),
            None,
            Some(fields),
        )
        .await?;
        Ok(())
    }

    async fn convert_lead(
        &self,
        request: &ConvertLeadRequest,
    ) -> Result<LeadConvertResult, CrmError> {
        let session = self.sessions.session().await?;
        let envelope = build_convert_envelope(request, &session.access_token)?;
        let url = format!("{}{}", session.instance_url, SOAP_PATH);
        debug!("[Salesforce] POST {} (convertLead {})", SOAP_PATH, request.lead_id);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Faults come back as HTTP 500 with an XML fault body; surface
            // the faultstring when there is one.
            return match parse_convert_response(&body) {
                Err(fault) => Err(fault),
                Ok(_) => Err(CrmError::Api {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                }),
            };
        }
        parse_convert_response(&body)
    }
}

fn api_error(status: u16, body: &str) -> CrmError {
    let message = serde_json::from_str::<Vec<ApiErrorBody>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .and_then(|error| match (error.error_code, error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    CrmError::Api { status, message }
}
