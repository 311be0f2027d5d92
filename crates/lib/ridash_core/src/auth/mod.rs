//! Authentication logic.
//!
//! Password verification, access/refresh token issuance, single-use refresh
//! rotation, the signed OAuth state and the account linker. Everything that
//! touches storage goes through [`store::AuthStore`] so the request-scoped
//! transaction stays in the caller's hands.

pub mod linker;
pub mod oauth_state;
pub mod password;
pub mod queries;
pub mod rotation;
pub mod store;
pub mod tokens;

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use chrono::Duration;
use thiserror::Error;

use crate::id::IdError;

/// Why a presented refresh token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    NotFound,
    Replay,
    Expired,
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshFailure::NotFound => "not found",
            RefreshFailure::Replay => "already used",
            RefreshFailure::Expired => "expired",
        })
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Refresh token {0}")]
    RefreshRejected(RefreshFailure),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("ID generation failed: {0}")]
    IdError(#[from] IdError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Signing key and token lifetimes, built once at start-up.
#[derive(Clone)]
pub struct AuthConfig {
    /// Issuer (`iss`) of access tokens.
    pub app_name: String,
    pub signing_key: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub oauth_state_ttl: Duration,
}

impl AuthConfig {
    /// Config with the default lifetimes: 15 minutes, 365 days, 10 minutes.
    pub fn new(app_name: impl Into<String>, signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            app_name: app_name.into(),
            signing_key: signing_key.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(365),
            oauth_state_ttl: Duration::minutes(10),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("app_name", &self.app_name)
            .field("signing_key", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("oauth_state_ttl", &self.oauth_state_ttl)
            .finish()
    }
}
