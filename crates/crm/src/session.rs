//! Salesforce session management.
//!
//! One integration user serves the whole backend, so a single cached session
//! is shared by every request. The cache lives behind an async mutex that is
//! held across re-authentication: concurrent requests arriving on an expired
//! session wait for one refresh instead of racing their own token exchanges.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::errors::CrmError;
use crate::models::{TokenErrorResponse, TokenResponse};

/// Sessions are treated as valid for a fixed 90 minutes after minting.
///
/// The token response carries `issued_at`, not an expiry, and password-grant
/// responses omit `expires_in` in common org configurations, so the window is
/// fixed rather than provider-driven.
pub const SESSION_TTL_MINUTES: i64 = 90;

const TOKEN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// A cached Salesforce session.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    /// Org instance URL, e.g. `https://acme.my.salesforce.com`.
    pub instance_url: String,
    /// Id of the authenticated integration user, from the identity URL.
    /// Used as the owner of converted records.
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Connected-app credentials, read from the environment.
///
/// Two grants are supported: refresh token (preferred) and username/password
/// with an optional security token. Fields are optional because each grant
/// needs a different subset; completeness is checked per grant.
#[derive(Debug, Clone)]
pub struct SalesforceCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub login_url: String,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security_token: Option<String>,
}

impl Default for SalesforceCredentials {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            refresh_token: None,
            username: None,
            password: None,
            security_token: None,
        }
    }
}

impl SalesforceCredentials {
    /// Reads `SALESFORCE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self {
            client_id: env_var("SALESFORCE_CLIENT_ID"),
            client_secret: env_var("SALESFORCE_CLIENT_SECRET"),
            login_url: env_var("SALESFORCE_LOGIN_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            refresh_token: env_var("SALESFORCE_REFRESH_TOKEN"),
            username: env_var("SALESFORCE_USERNAME"),
            password: env_var("SALESFORCE_PASSWORD"),
            security_token: env_var("SALESFORCE_SECURITY_TOKEN"),
        }
    }

    /// True when the refresh-token grant can be attempted.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Variable names still needed before the password grant can be attempted.
    /// The security token is legitimately absent for orgs with relaxed IP
    /// restrictions, so it is never reported missing.
    pub fn missing_for_password_grant(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("SALESFORCE_CLIENT_ID".to_string());
        }
        if self.client_secret.is_none() {
            missing.push("SALESFORCE_CLIENT_SECRET".to_string());
        }
        if self.username.is_none() {
            missing.push("SALESFORCE_USERNAME".to_string());
        }
        if self.password.is_none() {
            missing.push("SALESFORCE_PASSWORD".to_string());
        }
        missing
    }

    fn token_url(&self) -> String {
        format!("{}/services/oauth2/token", self.login_url)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Source of valid Salesforce sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns a non-expired session, authenticating first when necessary.
    async fn session(&self) -> Result<Session, CrmError>;
}

/// [`SessionProvider`] backed by the OAuth token endpoint.
///
/// Tries the refresh-token grant first and falls back to the password grant
/// on any failure of that path; fails with
/// [`CrmError::MissingCredentials`] when neither credential set is complete.
pub struct OAuthSessionProvider {
    credentials: SalesforceCredentials,
    http: reqwest::Client,
    cache: Mutex<Option<Session>>,
}

impl OAuthSessionProvider {
    pub fn new(credentials: SalesforceCredentials) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            credentials,
            http,
            cache: Mutex::new(None),
        })
    }

    async fn authenticate(&self) -> Result<Session, CrmError> {
        if self.credentials.can_refresh() {
            debug!("[Session] Authenticating via refresh token grant");
            let params = [
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_deref().unwrap_or("")),
                (
                    "client_secret",
                    self.credentials.client_secret.as_deref().unwrap_or(""),
                ),
                (
                    "refresh_token",
                    self.credentials.refresh_token.as_deref().unwrap_or(""),
                ),
            ];
            match self.token_request(&params).await {
                Ok(session) => {
                    info!("[Session] Authenticated with Salesforce (refresh token grant)");
                    return Ok(session);
                }
                Err(e) => {
                    warn!(
                        "[Session] Refresh token grant failed, falling back to password grant: {}",
                        e
                    );
                }
            }
        }

        let missing = self.credentials.missing_for_password_grant();
        if !missing.is_empty() {
            return Err(CrmError::MissingCredentials { missing });
        }

        debug!("[Session] Authenticating via password grant");
        let password = format!(
            "{}{}",
            self.credentials.password.as_deref().unwrap_or(""),
            self.credentials.security_token.as_deref().unwrap_or(""),
        );
        let params = [
            ("grant_type", "password"),
            ("client_id", self.credentials.client_id.as_deref().unwrap_or("")),
            (
                "client_secret",
                self.credentials.client_secret.as_deref().unwrap_or(""),
            ),
            ("username", self.credentials.username.as_deref().unwrap_or("")),
            ("password", password.as_str()),
        ];
        let session = self.token_request(&params).await?;
        info!("[Session] Authenticated with Salesforce (password grant)");
        Ok(session)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<Session, CrmError> {
        let response = self
            .http
            .post(self.credentials.token_url())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error_description.or(err.error))
                .unwrap_or(body);
            return Err(CrmError::AuthFailed {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CrmError::UnexpectedResponse(format!("token response: {e}")))?;

        Ok(Session {
            access_token: token.access_token,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            user_id: token.id.as_deref().and_then(user_id_from_identity_url),
            expires_at: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
        })
    }
}

#[async_trait]
impl SessionProvider for OAuthSessionProvider {
    async fn session(&self) -> Result<Session, CrmError> {
        let mut cache = self.cache.lock().await;
        if let Some(session) = cache.as_ref() {
            if !session.is_expired() {
                return Ok(session.clone());
            }
            debug!("[Session] Cached session expired, re-authenticating");
        }
        let session = self.authenticate().await?;
        *cache = Some(session.clone());
        Ok(session)
    }
}

/// User id segment of the identity URL
/// (`https://login.salesforce.com/id/{orgId}/{userId}`).
fn user_id_from_identity_url(identity_url: &str) -> Option<String> {
    let (_, path) = identity_url.split_once("/id/")?;
    let mut segments = path.trim_end_matches('/').split('/');
    segments.next()?; // org id
    segments
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
