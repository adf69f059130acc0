//! Server configuration, read once at startup.

use std::net::SocketAddr;

use oxygen_crm::SalesforceCredentials;

/// Runtime configuration for the proxy server.
///
/// Salesforce credentials are intentionally not validated here: the server
/// starts with whatever subset is present, and each request fails with a
/// descriptive error when the set turns out to be incomplete.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to; `PORT` overrides the port.
    pub listen_addr: SocketAddr,
    /// Origin the CORS layer admits, i.e. where the website is served from.
    pub frontend_url: String,
    /// Connected-app credentials for the Salesforce endpoints.
    pub salesforce: SalesforceCredentials,
    /// Gemini API key; the AI proxy answers 503 while this is unset.
    pub gemini_api_key: Option<String>,
    /// Default Gemini model for requests that do not name one.
    pub gemini_model: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3001);

        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            frontend_url: env_non_empty("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            salesforce: SalesforceCredentials::from_env(),
            gemini_api_key: env_non_empty("GEMINI_API_KEY"),
            gemini_model: env_non_empty("GEMINI_MODEL"),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
