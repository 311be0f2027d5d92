//! External OAuth provider client: authorization URL, code exchange and
//! identity lookup.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use ridash_core::auth::linker::ProviderGrant;
use ridash_core::models::auth::{ExternalIdentity, Provider};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GoogleConfig;
use crate::error::AppError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Error)]
pub enum OAuthClientError {
    #[error("code exchange failed: {0}")]
    Exchange(String),

    #[error("identity lookup failed: {0}")]
    Identity(String),

    #[error("provider misconfigured: {0}")]
    Config(String),
}

impl From<OAuthClientError> for AppError {
    fn from(e: OAuthClientError) -> Self {
        match e {
            OAuthClientError::Exchange(detail) => {
                debug!(detail = %detail, "oauth code exchange failed");
                AppError::Validation("Failed to exchange code".into())
            }
            OAuthClientError::Identity(detail) => {
                debug!(detail = %detail, "oauth identity lookup failed");
                AppError::Validation("Failed to verify identity".into())
            }
            OAuthClientError::Config(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

/// Endpoints and credentials of one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.into(),
            token_url: GOOGLE_TOKEN_URL.into(),
            userinfo_url: GOOGLE_USERINFO_URL.into(),
        }
    }
}

#[derive(Clone)]
pub struct OAuthProviderClient {
    provider: Provider,
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
}

impl OAuthProviderClient {
    pub fn new(
        provider: Provider,
        config: &GoogleConfig,
        endpoints: ProviderEndpoints,
        timeout: Duration,
    ) -> Result<Self, OAuthClientError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| OAuthClientError::Config(format!("{raw}: {e}")))
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OAuthClientError::Config(format!("http client: {e}")))?;
        Ok(Self {
            provider,
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            auth_url: parse(&endpoints.auth_url)?,
            token_url: parse(&endpoints.token_url)?,
            userinfo_url: parse(&endpoints.userinfo_url)?,
        })
    }

    pub fn google(config: &GoogleConfig, timeout: Duration) -> Result<Self, OAuthClientError> {
        Self::new(Provider::Google, config, ProviderEndpoints::google(), timeout)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Provider consent page URL carrying `state`.
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("scope", "openid email profile")
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url
    }

    /// Trade an authorization code for provider tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderGrant, OAuthClientError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthClientError::Exchange(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OAuthClientError::Exchange(format!("HTTP {}", resp.status())));
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| OAuthClientError::Exchange(format!("token response: {e}")))?;

        Ok(ProviderGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expiry: token
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            token_type: token.token_type,
        })
    }

    /// Look up the verified identity behind a provider access token.
    pub async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<ExternalIdentity, OAuthClientError> {
        let resp = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthClientError::Identity(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OAuthClientError::Identity(format!("HTTP {}", resp.status())));
        }

        let info = resp
            .json::<UserInfo>()
            .await
            .map_err(|e| OAuthClientError::Identity(format!("userinfo response: {e}")))?;

        if info.sub.is_empty() {
            return Err(OAuthClientError::Identity("empty subject".into()));
        }
        if info.email_verified == Some(false) {
            return Err(OAuthClientError::Identity("email not verified".into()));
        }
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| OAuthClientError::Identity("no email in profile".into()))?;

        Ok(ExternalIdentity {
            provider: self.provider,
            subject: info.sub,
            email,
            name: info.name,
        })
    }
}

/// Configured providers, keyed by provider.
pub type OAuthProviders = HashMap<Provider, OAuthProviderClient>;
