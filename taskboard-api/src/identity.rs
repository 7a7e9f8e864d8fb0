//! Identity providers for sign-in
//!
//! Sign-in is an OAuth authorization-code exchange: the browser is sent to
//! the provider's consent page, comes back to the callback with a `code`,
//! and the code is exchanged for the user's profile. Only the email and
//! display name are kept; they become the [`SessionUser`].
//!
//! Providers are looked up by name (`/api/auth/signin/:provider`) in an
//! [`IdentityProviders`] registry built at start-up.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskboard_shared::auth::session::SessionUser;
use validator::Validate;

use crate::config::GoogleConfig;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Upstream request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while talking to an identity provider
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No provider registered under that name
    #[error("Unknown identity provider: {0}")]
    UnknownProvider(String),

    /// The user declined or the provider refused the code
    #[error("Sign-in denied: {0}")]
    Denied(String),

    /// Network failure or timeout
    #[error("Identity provider request failed: {0}")]
    Request(String),

    /// Provider answered with an unexpected status
    #[error("Identity provider returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    /// Profile is missing a usable email or name
    #[error("Identity profile is invalid")]
    InvalidProfile(Vec<(String, String)>),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdentityError::Request(format!("timed out after {}s", REQUEST_TIMEOUT.as_secs()))
        } else {
            IdentityError::Request(err.to_string())
        }
    }
}

/// Profile returned by a provider
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl IdentityProfile {
    /// Turns the profile into a session user
    ///
    /// A missing name falls back to the email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidProfile` when the email is missing or
    /// malformed.
    pub fn into_session_user(self) -> Result<SessionUser, IdentityError> {
        let email = self.email.unwrap_or_default();
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        let user = SessionUser::new(email, name);

        user.validate().map_err(|errors| {
            IdentityError::InvalidProfile(
                errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, errs)| {
                        let message = errs
                            .iter()
                            .map(|e| e.code.to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        (field.to_string(), message)
                    })
                    .collect(),
            )
        })?;

        Ok(user)
    }
}

/// An OAuth identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name used in routes, e.g. `google`
    fn id(&self) -> &'static str;

    /// Consent page the browser is redirected to
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, IdentityError>;

    /// Exchanges an authorization code for the user's profile
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<SessionUser, IdentityError>;
}

/// Providers by name
#[derive(Clone, Default)]
pub struct IdentityProviders {
    providers: HashMap<&'static str, Arc<dyn IdentityProvider>>,
}

impl IdentityProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn IdentityProvider>, IdentityError> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownProvider(id.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google sign-in
pub struct GoogleProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl GoogleProvider {
    pub fn new(config: &GoogleConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String, IdentityError> {
        let url = reqwest::Url::parse_with_params(
            GOOGLE_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| IdentityError::Request(format!("Invalid authorization URL: {}", e)))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<SessionUser, IdentityError> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IdentityError::Denied("authorization code rejected".to_string()));
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus { status: status.as_u16() });
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        let profile: IdentityProfile = response.json().await?;

        let user = profile.into_session_user()?;
        tracing::debug!(provider = self.id(), email = %user.email, "Google profile fetched");

        Ok(user)
    }
}
