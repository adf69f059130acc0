//! Drives a completed form submission to a full set of Salesforce records.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::client::{create_record_id, escape_soql, parse_query, SalesforceApi};
use crate::conversion::policy::{run_step, StepName};
use crate::conversion::ConversionOutcome;
use crate::errors::CrmError;
use crate::models::{
    ContentDocumentRecord, CreatedServicePoint, InvoiceSubmission, LeadStatusRecord,
    MeterPointInput, QueryResponse, RecordId, SiteInput, SubmissionRecords,
};
use crate::records::{
    sobjects, AccountSyncFields, ContactFields, ContentDocumentLinkFields, ContentVersionFields,
    LeadSyncFields, NewAccountFields, NewOpportunityFields, OpportunitySyncFields, PremisesFields,
    ServicePointFields,
};
use crate::soap::ConvertLeadRequest;

/// Converted-status label used when the org's metadata cannot be read.
const FALLBACK_CONVERTED_STATUS: &str = "Closed - Converted";

/// Turns one submission into Account, Contact, Opportunity, Premises,
/// Service Point and ContentVersion records.
///
/// With a lead id the orchestrator prefers the native `convertLead` call,
/// which re-parents the Lead's activity history onto the new records. The
/// manual path then covers whatever conversion did not produce: a rejected
/// or failed conversion, a submission without a lead, or a conversion that
/// came back without an opportunity. Which failures abort and which are
/// tolerated is declared step by step in [`super::policy`].
pub struct ConversionOrchestrator {
    api: Arc<dyn SalesforceApi>,
}

impl ConversionOrchestrator {
    pub fn new(api: Arc<dyn SalesforceApi>) -> Self {
        Self { api }
    }

    /// Processes one submission end to end and reports the resolved ids.
    pub async fn process_submission(
        &self,
        submission: &InvoiceSubmission,
    ) -> Result<SubmissionRecords, CrmError> {
        info!(
            "[Conversion] Processing submission for {} ({} sites)",
            submission.company_name,
            submission.sites.len()
        );

        let mut account_id = None;
        let mut contact_id = None;
        let mut opportunity_id = None;

        if let Some(lead_id) = submission.lead_id.as_deref() {
            match self.convert_lead_path(lead_id, submission).await? {
                ConversionOutcome::Converted {
                    account_id: account,
                    contact_id: contact,
                    opportunity_id: opportunity,
                } => {
                    info!("[Conversion] Lead {lead_id} converted into account {account}");
                    account_id = Some(account);
                    contact_id = contact;
                    opportunity_id = opportunity;
                }
                ConversionOutcome::Failed { reason } => {
                    warn!(
                        "[Conversion] Lead {lead_id} not converted ({reason}); \
                         creating records manually"
                    );
                }
            }
        }

        // Manual path for whatever conversion left unresolved.
        let account_id = match account_id {
            Some(id) => id,
            None => {
                run_step(StepName::ResolveAccount, self.resolve_account(submission)).await??
            }
        };
        if contact_id.is_none() {
            contact_id = run_step(
                StepName::ResolveContact,
                self.resolve_contact(&account_id, submission),
            )
            .await??;
        }

        let _ = run_step(
            StepName::AccountSync,
            self.sync_account(&account_id, submission),
        )
        .await?;

        let opportunity_id = run_step(
            StepName::Opportunity,
            self.upsert_opportunity(
                opportunity_id,
                &account_id,
                contact_id.as_deref(),
                submission,
            ),
        )
        .await??;

        let (sites_created, service_points) =
            self.create_sites(submission, &opportunity_id).await?;

        let mut content_document_id = None;
        if let (Some(file_name), Some(file_content)) = (
            submission.file_name.as_deref(),
            submission.file_content.as_deref(),
        ) {
            content_document_id = run_step(
                StepName::FileUpload,
                self.upload_invoice(file_name, file_content, &account_id, &opportunity_id),
            )
            .await?
            .ok();
        }

        let records = SubmissionRecords {
            instance_url: self.api.instance_url().await?,
            account_id,
            contact_id,
            opportunity_id,
            stage: submission.opportunity_stage().to_string(),
            sites_created,
            service_points_created: service_points.len(),
            service_points,
            content_document_id,
        };
        info!(
            "[Conversion] Submission complete: account {}, opportunity {}",
            records.account_id, records.opportunity_id
        );
        Ok(records)
    }

    // ── lead conversion path ────────────────────────────────────────────

    /// Attempts the native conversion. Always yields an outcome rather than
    /// an error: everything that can go wrong in here is recoverable via the
    /// manual path.
    async fn convert_lead_path(
        &self,
        lead_id: &str,
        submission: &InvoiceSubmission,
    ) -> Result<ConversionOutcome, CrmError> {
        // Push the latest form fields onto the Lead first, so conversion
        // maps them onto the new records.
        let _ = run_step(StepName::LeadPresync, self.presync_lead(lead_id, submission)).await?;

        let converted_status = run_step(StepName::ConvertedStatus, self.converted_status_label())
            .await?
            .unwrap_or_else(|_| FALLBACK_CONVERTED_STATUS.to_string());

        let request = ConvertLeadRequest {
            lead_id: lead_id.to_string(),
            converted_status,
            opportunity_name: submission.opportunity_name(),
            owner_id: self.api.current_user_id().await?,
            do_not_create_opportunity: false,
        };
        debug!(
            "[Conversion] convertLead {} with status '{}'",
            lead_id, request.converted_status
        );

        let outcome = match run_step(StepName::ConvertLead, self.api.convert_lead(&request)).await?
        {
            Ok(result) if result.success => match result.account_id {
                Some(account_id) => ConversionOutcome::Converted {
                    account_id,
                    contact_id: result.contact_id,
                    opportunity_id: result.opportunity_id,
                },
                None => ConversionOutcome::Failed {
                    reason: "conversion reported success without an account id".to_string(),
                },
            },
            Ok(result) => ConversionOutcome::Failed {
                reason: result.error_summary(),
            },
            Err(err) => ConversionOutcome::Failed {
                reason: err.to_string(),
            },
        };
        Ok(outcome)
    }

    async fn presync_lead(
        &self,
        lead_id: &str,
        submission: &InvoiceSubmission,
    ) -> Result<(), CrmError> {
        let fields = serde_json::to_value(LeadSyncFields::from_submission(submission))?;
        self.api.update_record(sobjects::LEAD, lead_id, fields).await
    }

    /// The status label carrying the org's `IsConverted` flag.
    async fn converted_status_label(&self) -> Result<String, CrmError> {
        let soql = "SELECT MasterLabel FROM LeadStatus WHERE IsConverted = true LIMIT 1";
        let response: QueryResponse<LeadStatusRecord> = parse_query(self.api.query(soql).await?)?;
        Ok(response
            .into_first()
            .map(|row| row.master_label)
            .unwrap_or_else(|| FALLBACK_CONVERTED_STATUS.to_string()))
    }

    // ── manual record resolution ────────────────────────────────────────

    /// Finds the Account by company name or creates it.
    async fn resolve_account(&self, submission: &InvoiceSubmission) -> Result<String, CrmError> {
        let soql = format!(
            "SELECT Id FROM Account WHERE Name = '{}' LIMIT 1",
            escape_soql(&submission.company_name)
        );
        let existing: QueryResponse<RecordId> = parse_query(self.api.query(&soql).await?)?;
        if let Some(record) = existing.into_first() {
            info!(
                "[Conversion] Reusing account {} for {}",
                record.id, submission.company_name
            );
            return Ok(record.id);
        }

        let fields = serde_json::to_value(NewAccountFields::from_submission(submission))?;
        let id = create_record_id(self.api.as_ref(), sobjects::ACCOUNT, fields).await?;
        info!(
            "[Conversion] Created account {} for {}",
            id, submission.company_name
        );
        Ok(id)
    }

    /// Finds the Contact by email or creates it under the Account. `None`
    /// when the submission carries no contact details at all.
    async fn resolve_contact(
        &self,
        account_id: &str,
        submission: &InvoiceSubmission,
    ) -> Result<Option<String>, CrmError> {
        let email = submission.contact_email();
        if submission.contact_names().is_none() && email.is_none() {
            debug!("[Conversion] Submission has no contact details, skipping Contact");
            return Ok(None);
        }

        if let Some(email) = email {
            let soql = format!(
                "SELECT Id FROM Contact WHERE Email = '{}' LIMIT 1",
                escape_soql(email)
            );
            let existing: QueryResponse<RecordId> = parse_query(self.api.query(&soql).await?)?;
            if let Some(record) = existing.into_first() {
                info!("[Conversion] Reusing contact {} for {}", record.id, email);
                return Ok(Some(record.id));
            }
        }

        let fields = serde_json::to_value(ContactFields::new(account_id, submission))?;
        let id = create_record_id(self.api.as_ref(), sobjects::CONTACT, fields).await?;
        info!("[Conversion] Created contact {}", id);
        Ok(Some(id))
    }

    async fn sync_account(
        &self,
        account_id: &str,
        submission: &InvoiceSubmission,
    ) -> Result<(), CrmError> {
        let fields = serde_json::to_value(AccountSyncFields::from_submission(submission))?;
        self.api
            .update_record(sobjects::ACCOUNT, account_id, fields)
            .await
    }

    /// Updates the conversion-created Opportunity with the submission's
    /// stage, amount and requirements, or creates one on the manual path.
    async fn upsert_opportunity(
        &self,
        existing: Option<String>,
        account_id: &str,
        contact_id: Option<&str>,
        submission: &InvoiceSubmission,
    ) -> Result<String, CrmError> {
        if let Some(id) = existing {
            let fields = serde_json::to_value(OpportunitySyncFields::from_submission(submission))?;
            self.api
                .update_record(sobjects::OPPORTUNITY, &id, fields)
                .await?;
            info!("[Conversion] Updated opportunity {id}");
            return Ok(id);
        }

        let fields = serde_json::to_value(NewOpportunityFields::from_submission(
            submission, account_id, contact_id,
        ))?;
        let id = create_record_id(self.api.as_ref(), sobjects::OPPORTUNITY, fields).await?;
        info!("[Conversion] Created opportunity {id}");
        Ok(id)
    }

    // ── sites and files ─────────────────────────────────────────────────

    /// Creates a Premises per site and a Service Point per meter point. A
    /// failed Premises skips its meter points so no Service Point is left
    /// pointing at a location that does not exist.
    async fn create_sites(
        &self,
        submission: &InvoiceSubmission,
        opportunity_id: &str,
    ) -> Result<(usize, Vec<CreatedServicePoint>), CrmError> {
        let mut sites_created = 0;
        let mut service_points = Vec::new();

        for site in &submission.sites {
            let premises_id = match run_step(StepName::Sites, self.create_premises(site)).await? {
                Ok(id) => id,
                Err(_) => continue,
            };
            sites_created += 1;

            for meter_point in &site.meter_points {
                let created = run_step(
                    StepName::Sites,
                    self.create_service_point(
                        submission,
                        site,
                        meter_point,
                        opportunity_id,
                        &premises_id,
                    ),
                )
                .await?;
                if let Ok(id) = created {
                    service_points.push(CreatedServicePoint {
                        id,
                        mpan: meter_point.mpan.clone(),
                    });
                }
            }
        }

        if sites_created > 0 {
            info!(
                "[Conversion] Created {} premises and {} service points",
                sites_created,
                service_points.len()
            );
        }
        Ok((sites_created, service_points))
    }

    async fn create_premises(&self, site: &SiteInput) -> Result<String, CrmError> {
        let fields = serde_json::to_value(PremisesFields::from_site(site))?;
        create_record_id(self.api.as_ref(), sobjects::PREMISES, fields).await
    }

    async fn create_service_point(
        &self,
        submission: &InvoiceSubmission,
        site: &SiteInput,
        meter_point: &MeterPointInput,
        opportunity_id: &str,
        premises_id: &str,
    ) -> Result<String, CrmError> {
        let fields = serde_json::to_value(ServicePointFields::new(
            submission,
            site,
            meter_point,
            opportunity_id,
            premises_id,
        ))?;
        create_record_id(self.api.as_ref(), sobjects::SERVICE_POINT, fields).await
    }

    /// Uploads the invoice as a ContentVersion against the Account, then
    /// links the resulting document to the Opportunity.
    async fn upload_invoice(
        &self,
        file_name: &str,
        file_content: &str,
        account_id: &str,
        opportunity_id: &str,
    ) -> Result<String, CrmError> {
        let fields =
            serde_json::to_value(ContentVersionFields::new(file_name, file_content, account_id))?;
        let version_id =
            create_record_id(self.api.as_ref(), sobjects::CONTENT_VERSION, fields).await?;
        info!("[Conversion] Uploaded {file_name} as ContentVersion {version_id}");

        let soql = format!(
            "SELECT ContentDocumentId FROM ContentVersion WHERE Id = '{}' LIMIT 1",
            escape_soql(&version_id)
        );
        let documents: QueryResponse<ContentDocumentRecord> =
            parse_query(self.api.query(&soql).await?)?;
        let document_id = documents
            .into_first()
            .map(|row| row.content_document_id)
            .ok_or_else(|| {
                CrmError::UnexpectedResponse(format!(
                    "ContentVersion {version_id} has no ContentDocumentId"
                ))
            })?;

        let link = serde_json::to_value(ContentDocumentLinkFields::new(
            &document_id,
            opportunity_id,
        ))?;
        create_record_id(self.api.as_ref(), sobjects::CONTENT_DOCUMENT_LINK, link).await?;
        debug!("[Conversion] Linked document {document_id} to opportunity {opportunity_id}");
        Ok(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSalesforce, MOCK_DOCUMENT_ID, MOCK_INSTANCE_URL, MOCK_USER_ID};

    fn orchestrator(mock: &Arc<MockSalesforce>) -> ConversionOrchestrator {
        ConversionOrchestrator::new(mock.clone())
    }

    fn submission() -> InvoiceSubmission {
        InvoiceSubmission {
            company_name: "Acme Ltd".to_string(),
            contact_first_name: Some("Jane".to_string()),
            contact_last_name: Some("Doe".to_string()),
            email: Some("jane@acme.co.uk".to_string()),
            industry: Some("manufacturing".to_string()),
            ..Default::default()
        }
    }

    fn site_with_meters(count: usize) -> SiteInput {
        let meter_points = (0..count)
            .map(|n| MeterPointInput {
                mpan: Some(format!("10000000000{n}")),
                meter_number: Some(format!("M{n}")),
                fuel_type: Some("electricity".to_string()),
                consumption: Some(120.5),
                ..Default::default()
            })
            .collect();
        SiteInput {
            name: Some("Head Office".to_string()),
            address: Some("1 High Street, Leeds".to_string()),
            meter_points,
            ..Default::default()
        }
    }

    // ── manual path ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_manual_path_creates_account_contact_and_opportunity() {
        let mock = Arc::new(MockSalesforce::new());
        let records = orchestrator(&mock)
            .process_submission(&submission())
            .await
            .unwrap();

        assert_eq!(records.instance_url, MOCK_INSTANCE_URL);
        assert!(records.account_id.starts_with("001"));
        assert!(records.contact_id.as_ref().unwrap().starts_with("003"));
        assert!(records.opportunity_id.starts_with("006"));
        assert_eq!(records.stage, "Prospecting");
        assert_eq!(records.sites_created, 0);
        assert_eq!(records.service_points_created, 0);
        assert!(records.content_document_id.is_none());

        let accounts = mock.creates_of(sobjects::ACCOUNT);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0]["Name"], "Acme Ltd");
        assert_eq!(accounts[0]["Type"], "Prospect");
        assert_eq!(accounts[0]["Industry"], "Manufacturing");

        let contacts = mock.creates_of(sobjects::CONTACT);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0]["FirstName"], "Jane");
        assert_eq!(contacts[0]["LastName"], "Doe");
        assert_eq!(contacts[0]["AccountId"], records.account_id.as_str());

        let opportunities = mock.creates_of(sobjects::OPPORTUNITY);
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0]["Name"], "Acme Ltd - Energy Opportunity");
        assert_eq!(opportunities[0]["StageName"], "Prospecting");
        assert_eq!(
            opportunities[0]["ContactId"],
            records.contact_id.as_deref().unwrap()
        );

        // No conversion was attempted without a lead id.
        assert!(mock.converts().is_empty());
    }

    #[tokio::test]
    async fn test_manual_path_reuses_existing_account() {
        let mock = Arc::new(MockSalesforce::new());
        mock.seed_account("Acme Ltd", "001EXISTING0001");

        let records = orchestrator(&mock)
            .process_submission(&submission())
            .await
            .unwrap();

        assert_eq!(records.account_id, "001EXISTING0001");
        assert!(mock.creates_of(sobjects::ACCOUNT).is_empty());
        assert!(mock
            .queries()
            .iter()
            .any(|soql| soql == "SELECT Id FROM Account WHERE Name = 'Acme Ltd' LIMIT 1"));

        // The found account still receives the latest form fields.
        let updates = mock.updates_of(sobjects::ACCOUNT);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "001EXISTING0001");
        assert_eq!(updates[0].1["Industry"], "Manufacturing");
    }

    #[tokio::test]
    async fn test_manual_path_reuses_existing_contact_by_email() {
        let mock = Arc::new(MockSalesforce::new());
        mock.seed_contact("jane@acme.co.uk", "003EXISTING0001");

        let records = orchestrator(&mock)
            .process_submission(&submission())
            .await
            .unwrap();

        assert_eq!(records.contact_id.as_deref(), Some("003EXISTING0001"));
        assert!(mock.creates_of(sobjects::CONTACT).is_empty());
    }

    #[tokio::test]
    async fn test_submission_without_contact_details_skips_contact() {
        let mock = Arc::new(MockSalesforce::new());
        let submission = InvoiceSubmission {
            company_name: "Acme Ltd".to_string(),
            ..Default::default()
        };

        let records = orchestrator(&mock)
            .process_submission(&submission)
            .await
            .unwrap();

        assert!(records.contact_id.is_none());
        assert!(mock.creates_of(sobjects::CONTACT).is_empty());
        let opportunities = mock.creates_of(sobjects::OPPORTUNITY);
        assert!(opportunities[0].get("ContactId").is_none());
    }

    #[tokio::test]
    async fn test_contact_create_failure_aborts_the_submission() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_creates_of(sobjects::CONTACT, "INVALID_EMAIL_ADDRESS");

        let result = orchestrator(&mock).process_submission(&submission()).await;
        assert!(result.is_err());
        // The Account created before the failure stays; nothing rolls back.
        assert_eq!(mock.creates_of(sobjects::ACCOUNT).len(), 1);
    }

    #[tokio::test]
    async fn test_opportunity_create_failure_aborts_the_submission() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_creates_of(sobjects::OPPORTUNITY, "FIELD_CUSTOM_VALIDATION_EXCEPTION");

        let result = orchestrator(&mock).process_submission(&submission()).await;
        assert!(result.is_err());
        assert_eq!(mock.creates_of(sobjects::ACCOUNT).len(), 1);
        assert_eq!(mock.creates_of(sobjects::CONTACT).len(), 1);
    }

    #[tokio::test]
    async fn test_account_sync_failure_is_tolerated() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_updates_of(sobjects::ACCOUNT, "UNABLE_TO_LOCK_ROW");
        mock.seed_account("Acme Ltd", "001EXISTING0001");

        let records = orchestrator(&mock)
            .process_submission(&submission())
            .await
            .unwrap();
        assert_eq!(records.account_id, "001EXISTING0001");
    }

    #[tokio::test]
    async fn test_double_submission_reuses_created_records() {
        let mock = Arc::new(MockSalesforce::new());
        let orchestrator = orchestrator(&mock);

        let first = orchestrator.process_submission(&submission()).await.unwrap();
        let second = orchestrator.process_submission(&submission()).await.unwrap();

        assert_eq!(first.account_id, second.account_id);
        assert_eq!(first.contact_id, second.contact_id);
        assert_eq!(mock.creates_of(sobjects::ACCOUNT).len(), 1);
        assert_eq!(mock.creates_of(sobjects::CONTACT).len(), 1);
        // Each submission still gets its own Opportunity.
        assert_eq!(mock.creates_of(sobjects::OPPORTUNITY).len(), 2);
    }

    // ── lead conversion path ────────────────────────────────────────────

    fn submission_with_lead() -> InvoiceSubmission {
        InvoiceSubmission {
            lead_id: Some("00Q000000000123".to_string()),
            ..submission()
        }
    }

    #[tokio::test]
    async fn test_conversion_path_returns_converted_ids() {
        let mock = Arc::new(MockSalesforce::new());
        let records = orchestrator(&mock)
            .process_submission(&submission_with_lead())
            .await
            .unwrap();

        let converts = mock.converts();
        assert_eq!(converts.len(), 1);
        assert_eq!(converts[0].lead_id, "00Q000000000123");
        assert_eq!(converts[0].converted_status, "Closed - Converted");
        assert_eq!(
            converts[0].opportunity_name,
            "Acme Ltd - Energy Opportunity"
        );
        assert_eq!(converts[0].owner_id.as_deref(), Some(MOCK_USER_ID));
        assert!(!converts[0].do_not_create_opportunity);

        // The converted ids flow straight through to the caller.
        assert!(records.account_id.starts_with("001"));
        assert!(records.opportunity_id.starts_with("006"));
        assert!(mock.creates_of(sobjects::ACCOUNT).is_empty());
        assert!(mock.creates_of(sobjects::CONTACT).is_empty());
        assert!(mock.creates_of(sobjects::OPPORTUNITY).is_empty());

        // The Lead was pre-synced and the converted records re-synced.
        assert_eq!(mock.updates_of(sobjects::LEAD).len(), 1);
        assert_eq!(mock.updates_of(sobjects::ACCOUNT).len(), 1);
        let opportunity_updates = mock.updates_of(sobjects::OPPORTUNITY);
        assert_eq!(opportunity_updates.len(), 1);
        assert_eq!(opportunity_updates[0].0, records.opportunity_id);
        assert_eq!(opportunity_updates[0].1["StageName"], "Prospecting");
    }

    #[tokio::test]
    async fn test_conversion_uses_the_orgs_converted_status() {
        let mock = Arc::new(MockSalesforce::new());
        mock.set_converted_status("Closed - Won Over");

        orchestrator(&mock)
            .process_submission(&submission_with_lead())
            .await
            .unwrap();

        assert_eq!(mock.converts()[0].converted_status, "Closed - Won Over");
    }

    #[tokio::test]
    async fn test_rejected_conversion_falls_back_to_manual_path() {
        let mock = Arc::new(MockSalesforce::new());
        mock.reject_convert("lead is already converted");

        let records = orchestrator(&mock)
            .process_submission(&submission_with_lead())
            .await
            .unwrap();

        assert_eq!(mock.converts().len(), 1);
        assert_eq!(mock.creates_of(sobjects::ACCOUNT).len(), 1);
        assert_eq!(mock.creates_of(sobjects::OPPORTUNITY).len(), 1);
        assert!(records.account_id.starts_with("001"));
    }

    #[tokio::test]
    async fn test_convert_call_failure_falls_back_to_manual_path() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_convert();

        let records = orchestrator(&mock)
            .process_submission(&submission_with_lead())
            .await
            .unwrap();

        assert_eq!(mock.creates_of(sobjects::ACCOUNT).len(), 1);
        assert!(!records.account_id.is_empty());
    }

    #[tokio::test]
    async fn test_lead_presync_failure_does_not_block_conversion() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_updates_of(sobjects::LEAD, "ENTITY_IS_DELETED");

        let records = orchestrator(&mock)
            .process_submission(&submission_with_lead())
            .await
            .unwrap();

        assert_eq!(mock.converts().len(), 1);
        assert!(records.account_id.starts_with("001"));
    }

    // ── sites and service points ────────────────────────────────────────

    #[tokio::test]
    async fn test_sites_and_meter_points_are_created() {
        let mock = Arc::new(MockSalesforce::new());
        let submission = InvoiceSubmission {
            sites: vec![site_with_meters(2), site_with_meters(0)],
            total_consumption: Some(900.0),
            ..submission()
        };

        let records = orchestrator(&mock)
            .process_submission(&submission)
            .await
            .unwrap();

        assert_eq!(records.stage, "Qualification");
        assert_eq!(records.sites_created, 2);
        assert_eq!(records.service_points_created, 2);
        assert_eq!(records.service_points[0].mpan.as_deref(), Some("100000000000"));

        let premises = mock.creates_of(sobjects::PREMISES);
        assert_eq!(premises.len(), 2);
        assert_eq!(premises[0]["Name"], "Head Office");
        assert_eq!(
            premises[0]["vlocity_cmt__StreetAddress__c"],
            "1 High Street, Leeds"
        );

        let service_points = mock.creates_of(sobjects::SERVICE_POINT);
        assert_eq!(service_points.len(), 2);
        assert_eq!(
            service_points[0]["gtx_sales__Market_Identifier__c"],
            "100000000000"
        );
        assert_eq!(
            service_points[0]["gtx_sales__Opportunity__c"],
            records.opportunity_id.as_str()
        );
        // Meter-level consumption wins over the submission total.
        assert_eq!(service_points[0]["gtx_sales__Annual_Consumption__c"], 120.5);
    }

    #[tokio::test]
    async fn test_premises_failure_skips_its_meter_points() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_creates_of(sobjects::PREMISES, "REQUIRED_FIELD_MISSING");
        let submission = InvoiceSubmission {
            sites: vec![site_with_meters(2)],
            ..submission()
        };

        let records = orchestrator(&mock)
            .process_submission(&submission)
            .await
            .unwrap();

        assert_eq!(records.sites_created, 0);
        assert_eq!(records.service_points_created, 0);
        assert!(mock.creates_of(sobjects::SERVICE_POINT).is_empty());
    }

    #[tokio::test]
    async fn test_service_point_failures_do_not_abort() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_creates_of(sobjects::SERVICE_POINT, "FIELD_INTEGRITY_EXCEPTION");
        let submission = InvoiceSubmission {
            sites: vec![site_with_meters(2)],
            ..submission()
        };

        let records = orchestrator(&mock)
            .process_submission(&submission)
            .await
            .unwrap();

        assert_eq!(records.sites_created, 1);
        assert_eq!(records.service_points_created, 0);
    }

    // ── file upload ─────────────────────────────────────────────────────

    fn submission_with_file() -> InvoiceSubmission {
        InvoiceSubmission {
            file_name: Some("invoice.pdf".to_string()),
            file_content: Some("JVBERi0xLjQ=".to_string()),
            ..submission()
        }
    }

    #[tokio::test]
    async fn test_invoice_upload_links_document_to_opportunity() {
        let mock = Arc::new(MockSalesforce::new());
        let records = orchestrator(&mock)
            .process_submission(&submission_with_file())
            .await
            .unwrap();

        assert_eq!(records.content_document_id.as_deref(), Some(MOCK_DOCUMENT_ID));

        let versions = mock.creates_of(sobjects::CONTENT_VERSION);
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0]["Title"], "invoice.pdf");
        assert_eq!(versions[0]["PathOnClient"], "invoice.pdf");
        assert_eq!(versions[0]["VersionData"], "JVBERi0xLjQ=");
        assert_eq!(
            versions[0]["FirstPublishLocationId"],
            records.account_id.as_str()
        );

        let links = mock.creates_of(sobjects::CONTENT_DOCUMENT_LINK);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["ContentDocumentId"], MOCK_DOCUMENT_ID);
        assert_eq!(links[0]["LinkedEntityId"], records.opportunity_id.as_str());
        assert_eq!(links[0]["ShareType"], "V");
    }

    #[tokio::test]
    async fn test_invoice_upload_failure_is_tolerated() {
        let mock = Arc::new(MockSalesforce::new());
        mock.fail_creates_of(sobjects::CONTENT_VERSION, "STORAGE_LIMIT_EXCEEDED");

        let records = orchestrator(&mock)
            .process_submission(&submission_with_file())
            .await
            .unwrap();

        assert!(records.content_document_id.is_none());
        assert!(mock.creates_of(sobjects::CONTENT_DOCUMENT_LINK).is_empty());
    }
}
