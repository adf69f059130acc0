//! Salesforce endpoints: lead capture, full form-submission processing, and
//! a raw-SOQL passthrough for debugging.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use oxygen_crm::{InvoiceSubmission, NewLeadRequest, SubmissionRecords};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::parse_body;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

/// Success body of `POST /api/salesforce/lead`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadResponse {
    success: bool,
    lead_id: String,
    message: &'static str,
}

/// Creates a Lead from the first step of the contact form.
async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<LeadResponse>> {
    let request: NewLeadRequest = parse_body(body)?;
    let lead_id = state.leads.create_lead(&request).await?;
    Ok(Json(LeadResponse {
        success: true,
        lead_id,
        message: "Lead created successfully",
    }))
}

/// Success body of `POST /api/salesforce/invoice`.
#[derive(Serialize)]
struct InvoiceResponse {
    success: bool,
    message: &'static str,
    records: SubmissionRecords,
}

/// Runs the whole lead-to-opportunity workflow for a completed submission.
async fn process_invoice(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<InvoiceResponse>> {
    let submission: InvoiceSubmission = parse_body(body)?;
    if submission.company_name.trim().is_empty() {
        return Err(ApiError::BadRequest("Company name is required".to_string()));
    }

    let records = state.conversions.process_submission(&submission).await?;
    Ok(Json(InvoiceResponse {
        success: true,
        message: "Application processed successfully",
        records,
    }))
}

#[derive(Deserialize)]
struct QueryBody {
    soql: Option<String>,
}

/// Executes an arbitrary SOQL query and returns the raw result document.
async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let body: QueryBody = parse_body(body)?;
    let soql = body
        .soql
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("SOQL query is required".to_string()))?;

    let result = state.salesforce.query(&soql).await?;
    Ok(Json(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/salesforce/lead", post(create_lead))
        .route("/salesforce/invoice", post(process_invoice))
        .route("/salesforce/query", post(run_query))
}
