//! Hand-written Salesforce mock shared by the unit tests in this crate.
//!
//! The mock answers like a small in-memory org: created Accounts are findable
//! by name and Contacts by email, so the duplicate-avoidance paths can be
//! exercised the same way they run against a real org. Failures are injected
//! per sobject or per operation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::SalesforceApi;
use crate::errors::CrmError;
use crate::models::SaveResult;
use crate::records::sobjects;
use crate::soap::{ConvertLeadRequest, LeadConvertError, LeadConvertResult};

pub const MOCK_INSTANCE_URL: &str = "https://mock.my.salesforce.com";
pub const MOCK_USER_ID: &str = "005000000000001";
pub const MOCK_DOCUMENT_ID: &str = "069000000000001";

#[derive(Default)]
enum ConvertBehavior {
    /// Conversion succeeds with generated record ids.
    #[default]
    Succeed,
    /// The call completes but Salesforce reports `success=false`.
    Reject(String),
    /// The call itself fails (fault or transport).
    Fail,
}

#[derive(Default)]
struct MockState {
    counter: u64,
    accounts_by_name: HashMap<String, String>,
    contacts_by_email: HashMap<String, String>,
    converted_status: Option<String>,
    creates: Vec<(String, Value)>,
    updates: Vec<(String, String, Value)>,
    queries: Vec<String>,
    converts: Vec<ConvertLeadRequest>,
    failing_creates: HashMap<String, String>,
    failing_updates: HashMap<String, String>,
    convert_behavior: ConvertBehavior,
}

pub struct MockSalesforce {
    state: Mutex<MockState>,
}

impl MockSalesforce {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    // ── failure injection ───────────────────────────────────────────────

    /// Every create of `sobject` fails with an HTTP 400 carrying `code`.
    pub fn fail_creates_of(&self, sobject: &str, code: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .failing_creates
            .insert(sobject.to_string(), code.to_string());
    }

    /// Every update of `sobject` fails with an HTTP 400 carrying `code`.
    pub fn fail_updates_of(&self, sobject: &str, code: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .failing_updates
            .insert(sobject.to_string(), code.to_string());
    }

    /// `convertLead` completes but reports failure with `message`.
    pub fn reject_convert(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.convert_behavior = ConvertBehavior::Reject(message.to_string());
    }

    /// `convertLead` errors outright.
    pub fn fail_convert(&self) {
        let mut state = self.state.lock().unwrap();
        state.convert_behavior = ConvertBehavior::Fail;
    }

    // ── org seeding ─────────────────────────────────────────────────────

    pub fn seed_account(&self, name: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .accounts_by_name
            .insert(name.to_string(), id.to_string());
    }

    pub fn seed_contact(&self, email: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .contacts_by_email
            .insert(email.to_string(), id.to_string());
    }

    pub fn set_converted_status(&self, label: &str) {
        let mut state = self.state.lock().unwrap();
        state.converted_status = Some(label.to_string());
    }

    // ── call inspection ─────────────────────────────────────────────────

    /// Field payloads of every create against `sobject`, in call order.
    pub fn creates_of(&self, sobject: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .creates
            .iter()
            .filter(|(name, _)| name == sobject)
            .map(|(_, fields)| fields.clone())
            .collect()
    }

    /// `(record id, field payload)` of every update against `sobject`.
    pub fn updates_of(&self, sobject: &str) -> Vec<(String, Value)> {
        let state = self.state.lock().unwrap();
        state
            .updates
            .iter()
            .filter(|(name, _, _)| name == sobject)
            .map(|(_, id, fields)| (id.clone(), fields.clone()))
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn converts(&self) -> Vec<ConvertLeadRequest> {
        self.state.lock().unwrap().converts.clone()
    }
}

impl Default for MockSalesforce {
    fn default() -> Self {
        Self::new()
    }
}

fn next_id(state: &mut MockState, prefix: &str) -> String {
    state.counter += 1;
    format!("{prefix}{:012}", state.counter)
}

fn id_prefix(sobject: &str) -> &'static str {
    match sobject {
        sobjects::LEAD => "00Q",
        sobjects::ACCOUNT => "001",
        sobjects::CONTACT => "003",
        sobjects::OPPORTUNITY => "006",
        sobjects::PREMISES => "a0P",
        sobjects::SERVICE_POINT => "a0S",
        sobjects::CONTENT_VERSION => "068",
        sobjects::CONTENT_DOCUMENT_LINK => "06A",
        _ => "000",
    }
}

/// First single-quoted literal of a SOQL string, e.g. the name in
/// `... WHERE Name = 'Acme Ltd' LIMIT 1`.
fn quoted_literal(soql: &str) -> Option<&str> {
    soql.split('\'').nth(1)
}

fn query_document(rows: Vec<Value>) -> Value {
    json!({
        "totalSize": rows.len(),
        "done": true,
        "records": rows,
    })
}

#[async_trait]
impl SalesforceApi for MockSalesforce {
    async fn instance_url(&self) -> Result<String, CrmError> {
        Ok(MOCK_INSTANCE_URL.to_string())
    }

    async fn current_user_id(&self) -> Result<Option<String>, CrmError> {
        Ok(Some(MOCK_USER_ID.to_string()))
    }

    async fn query(&self, soql: &str) -> Result<Value, CrmError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(soql.to_string());

        let rows = if soql.contains("FROM Account") {
            quoted_literal(soql)
                .and_then(|name| state.accounts_by_name.get(name))
                .map(|id| vec![json!({"Id": id})])
                .unwrap_or_default()
        } else if soql.contains("FROM Contact") {
            quoted_literal(soql)
                .and_then(|email| state.contacts_by_email.get(email))
                .map(|id| vec![json!({"Id": id})])
                .unwrap_or_default()
        } else if soql.contains("FROM LeadStatus") {
            state
                .converted_status
                .as_ref()
                .map(|label| vec![json!({"MasterLabel": label})])
                .unwrap_or_default()
        } else if soql.contains("FROM ContentVersion") {
            vec![json!({"ContentDocumentId": MOCK_DOCUMENT_ID})]
        } else {
            Vec::new()
        };
        Ok(query_document(rows))
    }

    async fn create_record(&self, sobject: &str, fields: Value) -> Result<SaveResult, CrmError> {
        let mut state = self.state.lock().unwrap();
        state.creates.push((sobject.to_string(), fields.clone()));

        if let Some(code) = state.failing_creates.get(sobject) {
            return Err(CrmError::Api {
                status: 400,
                message: code.clone(),
            });
        }

        let id = next_id(&mut state, id_prefix(sobject));
        if sobject == sobjects::ACCOUNT {
            if let Some(name) = fields["Name"].as_str() {
                state.accounts_by_name.insert(name.to_string(), id.clone());
            }
        }
        if sobject == sobjects::CONTACT {
            if let Some(email) = fields["Email"].as_str() {
                state.contacts_by_email.insert(email.to_string(), id.clone());
            }
        }

        Ok(SaveResult {
            id: Some(id),
            success: true,
            errors: Vec::new(),
        })
    }

    async fn update_record(
        &self,
        sobject: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), CrmError> {
        let mut state = self.state.lock().unwrap();
        state
            .updates
            .push((sobject.to_string(), id.to_string(), fields));

        if let Some(code) = state.failing_updates.get(sobject) {
            return Err(CrmError::Api {
                status: 400,
                message: code.clone(),
            });
        }
        Ok(())
    }

    async fn convert_lead(
        &self,
        request: &ConvertLeadRequest,
    ) -> Result<LeadConvertResult, CrmError> {
        let mut state = self.state.lock().unwrap();
        state.converts.push(request.clone());

        match &state.convert_behavior {
            ConvertBehavior::Succeed => {
                let account_id = next_id(&mut state, "001");
                let contact_id = next_id(&mut state, "003");
                let opportunity_id = next_id(&mut state, "006");
                Ok(LeadConvertResult {
                    success: true,
                    account_id: Some(account_id),
                    contact_id: Some(contact_id),
                    opportunity_id: Some(opportunity_id),
                    errors: Vec::new(),
                })
            }
            ConvertBehavior::Reject(message) => Ok(LeadConvertResult {
                success: false,
                account_id: None,
                contact_id: None,
                opportunity_id: None,
                errors: vec![LeadConvertError {
                    status_code: Some("CANNOT_UPDATE_CONVERTED_LEAD".to_string()),
                    message: message.clone(),
                }],
            }),
            ConvertBehavior::Fail => Err(CrmError::Soap(
                "mock convertLead transport failure".to_string(),
            )),
        }
    }
}
