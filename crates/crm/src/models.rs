//! Wire models for the Salesforce REST API and the form-submission payloads
//! the website sends to this backend.

use serde::{Deserialize, Serialize};

/// Response body of the OAuth token endpoint.
///
/// Salesforce returns more fields (`signature`, `issued_at`, ...) than we
/// consume; `issued_at` is a mint timestamp, not an expiry, which is why the
/// session layer applies its own fixed lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    /// Identity URL, e.g. `https://login.salesforce.com/id/{orgId}/{userId}`.
    pub id: Option<String>,
}

/// Error body of the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Result of a SOQL query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<R> {
    pub total_size: i64,
    #[serde(default)]
    pub done: bool,
    #[serde(default = "Vec::new")]
    pub records: Vec<R>,
}

impl<R> QueryResponse<R> {
    /// First record of the result set, consuming the response.
    pub fn into_first(self) -> Option<R> {
        self.records.into_iter().next()
    }
}

/// A record projected down to its `Id` column.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordId {
    #[serde(rename = "Id")]
    pub id: String,
}

/// A `LeadStatus` metadata row.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadStatusRecord {
    #[serde(rename = "MasterLabel")]
    pub master_label: String,
}

/// A `ContentVersion` row projected to its parent document id.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentDocumentRecord {
    #[serde(rename = "ContentDocumentId")]
    pub content_document_id: String,
}

/// Response body of a record create (`POST /sobjects/{type}`).
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// One entry of the error array Salesforce returns on a failed REST call.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
}

/// Body of `POST /api/salesforce/lead` — step 1 of the website form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeadRequest {
    pub contact_name: String,
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    /// `"tpi"` for third-party intermediaries, anything else for end users.
    pub user_type: Option<String>,
    pub tpi_identifier: Option<String>,
}

/// A meter/supply point within a site, as parsed from an uploaded invoice or
/// portfolio file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterPointInput {
    /// MPAN or equivalent market identifier.
    pub mpan: Option<String>,
    pub meter_number: Option<String>,
    pub fuel_type: Option<String>,
    /// Annual consumption for this meter point; the submission-level total is
    /// used when absent.
    pub consumption: Option<f64>,
    pub product_preference: Option<String>,
    pub address: Option<String>,
}

/// A physical location in the prospect's portfolio.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub meter_points: Vec<MeterPointInput>,
}

/// Body of `POST /api/salesforce/invoice` — the completed multi-step form.
///
/// Contact fields come in two spellings depending on which UI flow produced
/// the payload (`contactName` vs `contactFirstName`/`contactLastName`, and
/// likewise for email and phone); accessors below resolve the precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSubmission {
    pub company_name: String,
    pub company_number: Option<String>,
    pub contact_name: Option<String>,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub email: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub contact_phone: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    /// Employee-count band, e.g. `"51-200"` or `"500+"`.
    pub company_size: Option<String>,
    pub use_case: Option<String>,
    pub timeline: Option<String>,
    pub budget: Option<String>,
    pub portfolio_size: Option<String>,
    /// Preferred contract duration, carried onto each service point.
    pub duration: Option<String>,
    /// Lead created in step 1; presence selects the conversion path.
    pub lead_id: Option<String>,
    pub total_amount: Option<f64>,
    /// Submission-level annual consumption in MWh.
    pub total_consumption: Option<f64>,
    #[serde(default)]
    pub sites: Vec<SiteInput>,
    /// Base64-encoded invoice or portfolio file.
    pub file_content: Option<String>,
    pub file_name: Option<String>,
}

impl InvoiceSubmission {
    /// First/last contact name, preferring the single `contactName` field.
    pub fn contact_names(&self) -> Option<(String, String)> {
        if let Some(full) = non_empty(self.contact_name.as_deref()) {
            let (first, last) = split_contact_name(full);
            return Some((first, last));
        }
        let first = non_empty(self.contact_first_name.as_deref())?;
        let last = non_empty(self.contact_last_name.as_deref()).unwrap_or("Unknown");
        Some((first.to_string(), last.to_string()))
    }

    /// Contact email, preferring the short `email` spelling.
    pub fn contact_email(&self) -> Option<&str> {
        non_empty(self.email.as_deref()).or_else(|| non_empty(self.contact_email.as_deref()))
    }

    /// Contact phone, preferring the short `phone` spelling.
    pub fn contact_phone(&self) -> Option<&str> {
        non_empty(self.phone.as_deref()).or_else(|| non_empty(self.contact_phone.as_deref()))
    }

    /// Opportunity name: `"{company} - {use case or Energy} Opportunity"`.
    pub fn opportunity_name(&self) -> String {
        let use_case = non_empty(self.use_case.as_deref()).unwrap_or("Energy");
        format!("{} - {} Opportunity", self.company_name, use_case)
    }

    /// Stage is `Qualification` once the prospect has uploaded a portfolio.
    pub fn opportunity_stage(&self) -> &'static str {
        if self.sites.is_empty() {
            "Prospecting"
        } else {
            "Qualification"
        }
    }
}

/// A service point created during a submission, reported back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedServicePoint {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpan: Option<String>,
}

/// Identifiers resolved by a completed submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecords {
    /// Instance URL for building deep links to the created records.
    pub instance_url: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub opportunity_id: String,
    pub stage: String,
    pub sites_created: usize,
    pub service_points_created: usize,
    pub service_points: Vec<CreatedServicePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_document_id: Option<String>,
}

/// Splits a full contact name on the first whitespace gap.
///
/// The first token becomes the first name and the remainder the last name;
/// a single-token name gets `"Unknown"` as its last name, which Salesforce
/// requires to be non-empty.
pub fn split_contact_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() {
        "Unknown".to_string()
    } else {
        rest
    };
    (first, last)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
