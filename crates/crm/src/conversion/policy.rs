//! Per-step failure policy for the conversion workflow.
//!
//! Each external call the orchestrator makes belongs to a named step, and
//! each step is either fatal (its failure aborts the submission) or
//! best-effort (its failure is logged and the submission continues). The
//! policy lives in one table here so it can be audited and tested apart from
//! the workflow itself.

use std::fmt;
use std::future::Future;

use log::{error, warn};

use crate::errors::CrmError;

/// The steps of a submission, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepName {
    /// Re-apply latest form fields to the Lead before converting it.
    LeadPresync,
    /// Resolve the org's converted-status label.
    ConvertedStatus,
    /// The SOAP conversion call itself.
    ConvertLead,
    /// Find-or-create the Account on the manual path.
    ResolveAccount,
    /// Find-or-create the Contact on the manual path.
    ResolveContact,
    /// Re-apply industry/employee-count/website onto the Account.
    AccountSync,
    /// Create or update the Opportunity.
    Opportunity,
    /// Premises and service-point creation.
    Sites,
    /// Invoice upload and document linking.
    FileUpload,
}

/// What a step's failure means for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Failure aborts the submission and surfaces to the caller.
    Fatal,
    /// Failure is logged and the submission continues without the step's
    /// result.
    BestEffort,
}

/// The policy table. The submission optimizes for best-effort maximal record
/// creation: only the steps whose output later steps depend on are fatal.
pub const STEP_POLICIES: [(StepName, StepPolicy); 9] = [
    (StepName::LeadPresync, StepPolicy::BestEffort),
    (StepName::ConvertedStatus, StepPolicy::BestEffort),
    (StepName::ConvertLead, StepPolicy::BestEffort),
    (StepName::ResolveAccount, StepPolicy::Fatal),
    (StepName::ResolveContact, StepPolicy::Fatal),
    (StepName::AccountSync, StepPolicy::BestEffort),
    (StepName::Opportunity, StepPolicy::Fatal),
    (StepName::Sites, StepPolicy::BestEffort),
    (StepName::FileUpload, StepPolicy::BestEffort),
];

impl StepName {
    pub fn policy(self) -> StepPolicy {
        STEP_POLICIES
            .iter()
            .find(|(step, _)| *step == self)
            .map(|(_, policy)| *policy)
            // Steps missing from the table abort.
            .unwrap_or(StepPolicy::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeadPresync => "lead-presync",
            Self::ConvertedStatus => "converted-status",
            Self::ConvertLead => "convert-lead",
            Self::ResolveAccount => "resolve-account",
            Self::ResolveContact => "resolve-contact",
            Self::AccountSync => "account-sync",
            Self::Opportunity => "opportunity",
            Self::Sites => "sites",
            Self::FileUpload => "file-upload",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs one step under its declared policy.
///
/// A fatal step's failure propagates as the outer `Err`. A best-effort
/// step's failure is logged and handed back as the inner `Err`, so callers
/// that need the reason (the conversion fallback does) still have it.
pub(crate) async fn run_step<T, F>(
    step: StepName,
    operation: F,
) -> Result<Result<T, CrmError>, CrmError>
where
    F: Future<Output = Result<T, CrmError>>,
{
    match operation.await {
        Ok(value) => Ok(Ok(value)),
        Err(err) => match step.policy() {
            StepPolicy::Fatal => {
                error!("[Conversion] Step {} failed: {}", step, err);
                Err(err)
            }
            StepPolicy::BestEffort => {
                warn!("[Conversion] Step {} failed (continuing): {}", step, err);
                Ok(Err(err))
            }
        },
    }
}
