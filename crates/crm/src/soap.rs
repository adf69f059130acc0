//! Typed codec for the Partner API `convertLead` call.
//!
//! The REST API has no convert operation, so this is the one SOAP call the
//! backend makes. Requests are built with an XML writer (text content is
//! escaped, so company names with `&` or quotes cannot break the envelope)
//! and responses are read with an event parser keyed on local element names,
//! which keeps us independent of whatever namespace prefixes the server picks.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::CrmError;

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const PARTNER_NS: &str = "urn:partner.soap.sforce.com";

/// Parameters of a `convertLead` call.
#[derive(Debug, Clone)]
pub struct ConvertLeadRequest {
    pub lead_id: String,
    /// Lead status label whose `IsConverted` flag is set for this org.
    pub converted_status: String,
    /// Name for the Opportunity the conversion creates.
    pub opportunity_name: String,
    /// New owner of the converted records; the lead owner keeps them when
    /// absent.
    pub owner_id: Option<String>,
    pub do_not_create_opportunity: bool,
}

/// One `<errors>` entry from a conversion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadConvertError {
    pub status_code: Option<String>,
    pub message: String,
}

/// Parsed `convertLead` result.
///
/// `success == false` is a business-level refusal (lead already converted,
/// validation rule, access rights); the ids are nil in that case and
/// [`errors`](Self::errors) says why.
#[derive(Debug, Clone, Default)]
pub struct LeadConvertResult {
    pub success: bool,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub errors: Vec<LeadConvertError>,
}

impl LeadConvertResult {
    /// First error message, for logs and fallback reasons.
    pub fn error_summary(&self) -> String {
        self.errors
            .first()
            .map(|error| match &error.status_code {
                Some(code) => format!("{}: {}", code, error.message),
                None => error.message.clone(),
            })
            .unwrap_or_else(|| "conversion reported failure without errors".to_string())
    }
}

/// Builds the SOAP envelope for a `convertLead` call.
pub fn build_convert_envelope(
    request: &ConvertLeadRequest,
    session_id: &str,
) -> Result<String, CrmError> {
    let mut writer = Writer::new(Vec::new());

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new("soapenv:Envelope");
    envelope.push_attribute(("xmlns:soapenv", SOAP_ENVELOPE_NS));
    envelope.push_attribute(("xmlns:urn", PARTNER_NS));
    write(&mut writer, Event::Start(envelope))?;

    write(&mut writer, Event::Start(BytesStart::new("soapenv:Header")))?;
    write(&mut writer, Event::Start(BytesStart::new("urn:SessionHeader")))?;
    write_text_element(&mut writer, "urn:sessionId", session_id)?;
    write(&mut writer, Event::End(BytesEnd::new("urn:SessionHeader")))?;
    write(&mut writer, Event::End(BytesEnd::new("soapenv:Header")))?;

    write(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;
    write(&mut writer, Event::Start(BytesStart::new("urn:convertLead")))?;
    write(&mut writer, Event::Start(BytesStart::new("urn:leadConverts")))?;
    write_text_element(&mut writer, "urn:convertedStatus", &request.converted_status)?;
    write_text_element(&mut writer, "urn:leadId", &request.lead_id)?;
    if let Some(owner_id) = &request.owner_id {
        write_text_element(&mut writer, "urn:ownerId", owner_id)?;
    }
    write_text_element(&mut writer, "urn:opportunityName", &request.opportunity_name)?;
    write_text_element(
        &mut writer,
        "urn:doNotCreateOpportunity",
        if request.do_not_create_opportunity {
            "true"
        } else {
            "false"
        },
    )?;
    write(&mut writer, Event::End(BytesEnd::new("urn:leadConverts")))?;
    write(&mut writer, Event::End(BytesEnd::new("urn:convertLead")))?;
    write(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;

    write(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Parses a `convertLead` response envelope.
///
/// A SOAP fault (bad session, malformed request) is an error; a well-formed
/// result with `success == false` is not — the caller decides how to recover.
pub fn parse_convert_response(xml: &str) -> Result<LeadConvertResult, CrmError> {
    let mut reader = Reader::from_str(xml);

    let mut result = LeadConvertResult::default();
    let mut current: Option<Vec<u8>> = None;
    let mut in_errors = false;
    let mut error_message: Option<String> = None;
    let mut error_status_code: Option<String> = None;
    let mut faultstring: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"errors" {
                    in_errors = true;
                    error_message = None;
                    error_status_code = None;
                }
                current = Some(name);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| CrmError::Soap(format!("invalid response text: {e}")))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match current.as_deref() {
                    Some(b"accountId") => result.account_id = Some(text.to_string()),
                    Some(b"contactId") => result.contact_id = Some(text.to_string()),
                    Some(b"opportunityId") => result.opportunity_id = Some(text.to_string()),
                    Some(b"success") => result.success = text == "true",
                    Some(b"message") if in_errors => error_message = Some(text.to_string()),
                    Some(b"statusCode") if in_errors => error_status_code = Some(text.to_string()),
                    Some(b"faultstring") => faultstring = Some(text.to_string()),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"errors" {
                    in_errors = false;
                    if let Some(message) = error_message.take() {
                        result.errors.push(LeadConvertError {
                            status_code: error_status_code.take(),
                            message,
                        });
                    }
                }
                current = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CrmError::Soap(format!("invalid response XML: {e}"))),
            _ => {}
        }
    }

    if let Some(fault) = faultstring {
        return Err(CrmError::Soap(fault));
    }
    Ok(result)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CrmError> {
    writer
        .write_event(event)
        .map_err(|e| CrmError::Soap(format!("failed to build envelope: {e}")))
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), CrmError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))?;
    Ok(())
}
