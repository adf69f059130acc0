//! Lead creation from step 1 of the website form.

use std::sync::Arc;

use log::info;

use crate::client::{create_record_id, SalesforceApi};
use crate::errors::CrmError;
use crate::models::NewLeadRequest;
use crate::records::{sobjects, LeadFields};

/// Creates Lead records from step-1 form data.
///
/// A rejected create surfaces as [`CrmError::RecordCreateFailed`]; whether to
/// continue without a lead id is the caller's policy (the website does, so a
/// Salesforce hiccup never blocks the form).
pub struct LeadService {
    api: Arc<dyn SalesforceApi>,
}

impl LeadService {
    pub fn new(api: Arc<dyn SalesforceApi>) -> Self {
        Self { api }
    }

    /// Creates a Lead and returns its id.
    pub async fn create_lead(&self, request: &NewLeadRequest) -> Result<String, CrmError> {
        let fields = serde_json::to_value(LeadFields::from_request(request))?;
        let id = create_record_id(self.api.as_ref(), sobjects::LEAD, fields).await?;

        info!("[Leads] Created Lead {} for {}", id, request.company_name);
        Ok(id)
    }
}
