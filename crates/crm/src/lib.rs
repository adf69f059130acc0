//! Oxygen CRM - Salesforce integration for the Oxygen backend.
//!
//! This crate implements the Salesforce side of the website's lead funnel:
//! session management with refresh-token and password grants, Lead creation
//! from the first form step, and the lead-to-opportunity conversion workflow
//! a completed submission triggers (including sites, service points and the
//! uploaded invoice file).

pub mod client;
pub mod conversion;
pub mod errors;
pub mod leads;
pub mod models;
pub mod records;
pub mod session;
pub mod soap;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use client::{escape_soql, parse_query, SalesforceApi, SalesforceClient};
pub use conversion::{ConversionOrchestrator, ConversionOutcome, StepName, StepPolicy};
pub use errors::CrmError;
pub use leads::LeadService;
pub use models::{
    CreatedServicePoint, InvoiceSubmission, MeterPointInput, NewLeadRequest, QueryResponse,
    RecordId, SiteInput, SubmissionRecords,
};
pub use session::{OAuthSessionProvider, SalesforceCredentials, Session, SessionProvider};
pub use soap::{ConvertLeadRequest, LeadConvertError, LeadConvertResult};
