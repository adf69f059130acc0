use std::sync::Arc;

use crate::config::Config;
use oxygen_ai::{ContentGenerator, GeminiClient};
use oxygen_crm::{
    ConversionOrchestrator, LeadService, OAuthSessionProvider, SalesforceApi, SalesforceClient,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Shared state handed to every handler.
pub struct AppState {
    /// Raw Salesforce API access, used by the SOQL passthrough.
    pub salesforce: Arc<dyn SalesforceApi>,
    pub leads: Arc<LeadService>,
    pub conversions: Arc<ConversionOrchestrator>,
    /// `None` when no Gemini API key is configured; `/api/ai/generate`
    /// then answers 503 instead of failing on every call.
    pub generator: Option<Arc<dyn ContentGenerator>>,
}

pub fn init_tracing() {
    let log_format = std::env::var("OXYGEN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let sessions = Arc::new(OAuthSessionProvider::new(config.salesforce.clone())?);
    let salesforce: Arc<dyn SalesforceApi> = Arc::new(SalesforceClient::new(sessions)?);

    let generator: Option<Arc<dyn ContentGenerator>> = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ) {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            tracing::warn!("Generative AI proxy disabled: {err}");
            None
        }
    };

    Ok(Arc::new(AppState {
        leads: Arc::new(LeadService::new(salesforce.clone())),
        conversions: Arc::new(ConversionOrchestrator::new(salesforce.clone())),
        salesforce,
        generator,
    }))
}
