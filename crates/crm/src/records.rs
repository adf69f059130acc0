//! Typed field sets for the sObjects this backend writes, and the mapping
//! rules that fill them from a form submission.
//!
//! Serialized shapes use the Salesforce REST field names (PascalCase for
//! standard fields, namespaced `__c` names for the energy package objects).

use chrono::{Duration, SecondsFormat, Utc};
use serde::Serialize;

use crate::models::{InvoiceSubmission, MeterPointInput, NewLeadRequest, SiteInput};

/// sObject API names used by this backend.
pub mod sobjects {
    pub const LEAD: &str = "Lead";
    pub const ACCOUNT: &str = "Account";
    pub const CONTACT: &str = "Contact";
    pub const OPPORTUNITY: &str = "Opportunity";
    pub const PREMISES: &str = "vlocity_cmt__Premises__c";
    pub const SERVICE_POINT: &str = "gtx_sales__Service_Point__c";
    pub const CONTENT_VERSION: &str = "ContentVersion";
    pub const CONTENT_DOCUMENT_LINK: &str = "ContentDocumentLink";
}

/// Fields for a new `Lead` record from step 1 of the form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeadFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub last_name: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub lead_source: &'static str,
    pub status: &'static str,
    pub description: String,
}

impl LeadFields {
    pub fn from_request(request: &NewLeadRequest) -> Self {
        let (first_name, last_name) = crate::models::split_contact_name(&request.contact_name);
        let is_tpi = request.user_type.as_deref() == Some("tpi");
        let mut description = format!(
            "Created via Web Form. TPI: {}",
            if is_tpi { "Yes" } else { "No" }
        );
        if let Some(tpi_identifier) = request
            .tpi_identifier
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        {
            description.push_str(&format!("\nTPI Identifier: {tpi_identifier}"));
        }
        Self {
            first_name: Some(first_name).filter(|name| !name.is_empty()),
            last_name,
            company: request.company_name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            title: request.job_title.clone(),
            website: request.website.clone(),
            lead_source: "Web",
            status: "Open - Not Contacted",
            description,
        }
    }
}

/// Fields re-applied to an existing `Lead` right before conversion, so the
/// converted Account/Contact inherit the latest form state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeadSyncFields {
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_employees: Option<i64>,
}

impl LeadSyncFields {
    pub fn from_submission(submission: &InvoiceSubmission) -> Self {
        Self {
            company: submission.company_name.clone(),
            email: submission.contact_email().map(str::to_string),
            phone: submission.contact_phone().map(str::to_string),
            title: submission.job_title.clone(),
            website: submission.website.clone(),
            industry: submission.industry.as_deref().map(capitalize_first),
            number_of_employees: submission
                .company_size
                .as_deref()
                .and_then(employee_band_lower_bound),
        }
    }
}

/// The Account fields a submission refreshes on every pass, whether the
/// Account was just created, converted from a Lead, or already existed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountSyncFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_employees: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub description: String,
}

impl AccountSyncFields {
    pub fn from_submission(submission: &InvoiceSubmission) -> Self {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut description = format!("Updated from Web Form on {timestamp}");
        if submission.use_case.is_some()
            || submission.timeline.is_some()
            || submission.budget.is_some()
        {
            description.push_str(&format!(
                "\n\nRequirements:\nUse Case: {}\nTimeline: {}\nBudget: {}",
                submission.use_case.as_deref().unwrap_or(""),
                submission.timeline.as_deref().unwrap_or(""),
                submission.budget.as_deref().unwrap_or(""),
            ));
        }
        Self {
            industry: submission.industry.as_deref().map(capitalize_first),
            number_of_employees: submission
                .company_size
                .as_deref()
                .and_then(employee_band_lower_bound),
            website: submission.website.clone(),
            description,
        }
    }
}

/// Fields for a new `Account` on the manual path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewAccountFields {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(rename = "Type")]
    pub account_type: &'static str,
    #[serde(flatten)]
    pub sync: AccountSyncFields,
}

impl NewAccountFields {
    pub fn from_submission(submission: &InvoiceSubmission) -> Self {
        Self {
            name: submission.company_name.clone(),
            account_number: submission.company_number.clone(),
            account_type: "Prospect",
            sync: AccountSyncFields::from_submission(submission),
        }
    }
}

/// Fields for a new `Contact` on the manual path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactFields {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Mirrors `Phone`; the sales team dials mobile first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ContactFields {
    pub fn new(account_id: &str, submission: &InvoiceSubmission) -> Self {
        let (first_name, last_name) = submission
            .contact_names()
            .unwrap_or_else(|| (String::new(), "Unknown".to_string()));
        let phone = submission.contact_phone().map(str::to_string);
        Self {
            account_id: account_id.to_string(),
            first_name: Some(first_name).filter(|name| !name.is_empty()),
            last_name,
            email: submission.contact_email().map(str::to_string),
            phone: phone.clone(),
            mobile_phone: phone,
            title: submission.job_title.clone(),
        }
    }
}

/// The Opportunity fields a submission refreshes: stage, value, close date
/// and the business-detail description block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpportunitySyncFields {
    pub stage_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub close_date: String,
    pub description: String,
}

impl OpportunitySyncFields {
    pub fn from_submission(submission: &InvoiceSubmission) -> Self {
        Self {
            stage_name: submission.opportunity_stage().to_string(),
            amount: submission.total_amount,
            close_date: default_close_date(),
            description: format!(
                "Generated from Web Form.\nUse Case: {}\nTimeline: {}\nBudget: {}\nPortfolio Size: {}\n",
                submission.use_case.as_deref().unwrap_or(""),
                submission.timeline.as_deref().unwrap_or(""),
                submission.budget.as_deref().unwrap_or(""),
                submission.portfolio_size.as_deref().unwrap_or(""),
            ),
        }
    }
}

/// Fields for a new `Opportunity` on the manual path.
///
/// `ContactId` is create-only on Opportunity (it seeds the primary contact
/// role), so it appears here and not on [`OpportunitySyncFields`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewOpportunityFields {
    pub name: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(flatten)]
    pub sync: OpportunitySyncFields,
}

impl NewOpportunityFields {
    pub fn from_submission(
        submission: &InvoiceSubmission,
        account_id: &str,
        contact_id: Option<&str>,
    ) -> Self {
        Self {
            name: submission.opportunity_name(),
            account_id: account_id.to_string(),
            contact_id: contact_id.map(str::to_string),
            sync: OpportunitySyncFields::from_submission(submission),
        }
    }
}

/// Fields for a `vlocity_cmt__Premises__c` record, one per uploaded site.
#[derive(Debug, Clone, Serialize)]
pub struct PremisesFields {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(
        rename = "vlocity_cmt__StreetAddress__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub street_address: Option<String>,
    #[serde(rename = "vlocity_cmt__Status__c")]
    pub status: &'static str,
    #[serde(rename = "vlocity_cmt__PremisesType__c")]
    pub premises_type: &'static str,
}

impl PremisesFields {
    pub fn from_site(site: &SiteInput) -> Self {
        Self {
            name: site
                .name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or("Site")
                .to_string(),
            street_address: site.address.clone(),
            status: "Active",
            premises_type: "Commercial",
        }
    }
}

/// Fields for a `gtx_sales__Service_Point__c` record, one per meter point,
/// linked to both its premises and the submission's opportunity.
#[derive(Debug, Clone, Serialize)]
pub struct ServicePointFields {
    #[serde(
        rename = "gtx_sales__Market_Identifier__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub market_identifier: Option<String>,
    #[serde(
        rename = "gtx_sales__Service_External_Id__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_external_id: Option<String>,
    #[serde(rename = "gtx_sales__Service_Type__c")]
    pub service_type: String,
    #[serde(
        rename = "gtx_sales__Annual_Consumption__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub annual_consumption: Option<f64>,
    #[serde(
        rename = "gtx_sales__Product_Preference__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_preference: Option<String>,
    #[serde(
        rename = "gtx_sales__Duration__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,
    #[serde(
        rename = "gtx_sales__Site_Contact_Name__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub site_contact_name: Option<String>,
    #[serde(
        rename = "gtx_sales__Site_Contact_Email__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub site_contact_email: Option<String>,
    #[serde(
        rename = "gtx_sales__Site_Contact_Phone__c",
        skip_serializing_if = "Option::is_none"
    )]
    pub site_contact_phone: Option<String>,
    #[serde(rename = "gtx_sales__Opportunity__c")]
    pub opportunity_id: String,
    #[serde(rename = "vlocity_cmt__PremisesId__c")]
    pub premises_id: String,
}

impl ServicePointFields {
    pub fn new(
        submission: &InvoiceSubmission,
        site: &SiteInput,
        meter_point: &MeterPointInput,
        opportunity_id: &str,
        premises_id: &str,
    ) -> Self {
        Self {
            market_identifier: meter_point.mpan.clone(),
            service_external_id: meter_point.meter_number.clone(),
            service_type: meter_point
                .fuel_type
                .as_deref()
                .filter(|fuel| !fuel.trim().is_empty())
                .map(capitalize_first)
                .unwrap_or_else(|| "Electricity".to_string()),
            annual_consumption: meter_point.consumption.or(submission.total_consumption),
            product_preference: meter_point.product_preference.clone(),
            duration: submission.duration.clone(),
            site_contact_name: site.contact_name.clone(),
            site_contact_email: site.contact_email.clone(),
            site_contact_phone: site.contact_phone.clone(),
            opportunity_id: opportunity_id.to_string(),
            premises_id: premises_id.to_string(),
        }
    }
}

/// Fields for a `ContentVersion` upload anchored to the Account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentVersionFields {
    pub title: String,
    pub path_on_client: String,
    /// Base64 file content, passed through exactly as received.
    pub version_data: String,
    pub first_publish_location_id: String,
}

impl ContentVersionFields {
    pub fn new(file_name: &str, file_content: &str, account_id: &str) -> Self {
        Self {
            title: file_name.to_string(),
            path_on_client: file_name.to_string(),
            version_data: file_content.to_string(),
            first_publish_location_id: account_id.to_string(),
        }
    }
}

/// Fields linking an uploaded document to the Opportunity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentDocumentLinkFields {
    pub content_document_id: String,
    pub linked_entity_id: String,
    /// `V` grants viewer access to everyone who can see the Opportunity.
    pub share_type: &'static str,
}

impl ContentDocumentLinkFields {
    pub fn new(content_document_id: &str, opportunity_id: &str) -> Self {
        Self {
            content_document_id: content_document_id.to_string(),
            linked_entity_id: opportunity_id.to_string(),
            share_type: "V",
        }
    }
}

/// Uppercases the first character, leaving the rest untouched
/// (`"electricity"` becomes `"Electricity"`).
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Lower bound of an employee-count band: `"51-200"` → 51, `"500+"` → 500.
///
/// Returns `None` for bands without a leading number, and for a zero lower
/// bound, which Salesforce treats the same as "not provided".
pub fn employee_band_lower_bound(band: &str) -> Option<i64> {
    let first_segment = band.split('-').next().unwrap_or(band);
    let digits: String = first_segment
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<i64>().ok().filter(|count| *count > 0)
}

/// Close date used for every submission-created Opportunity: today + 30 days.
pub fn default_close_date() -> String {
    (Utc::now() + Duration::days(30)).format("%Y-%m-%d").to_string()
}
