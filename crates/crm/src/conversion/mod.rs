//! Lead-to-opportunity conversion workflow.
//!
//! The entry point is [`ConversionOrchestrator::process_submission`], which
//! walks a form submission through the Salesforce-native `convertLead` path
//! and, when that is unavailable or fails, through manual record creation.
//! Failure handling per step is declared in [`policy`].

mod orchestrator;
mod policy;

pub use orchestrator::ConversionOrchestrator;
pub use policy::{StepName, StepPolicy, STEP_POLICIES};

/// What the `convertLead` attempt produced.
///
/// `Failed` is not an error: the orchestrator logs the reason and falls back
/// to creating the records manually, so a conversion-blocked Lead (already
/// converted, validation rule, SOAP outage) still yields a complete
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted {
        account_id: String,
        contact_id: Option<String>,
        opportunity_id: Option<String>,
    },
    Failed {
        reason: String,
    },
}
