//! Authentication domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[serde(with = "super::id_string")]
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    /// Null for users that only ever signed in through an OAuth provider.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity provider of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Email,
    Google,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Email => "email",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Provider::Email),
            "google" => Ok(Provider::Google),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Binds a `(provider, provider_user_id)` pair to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    #[serde(with = "super::id_string")]
    pub id: i64,
    #[serde(with = "super::id_string")]
    pub user_id: i64,
    pub provider: Provider,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Credentials returned by an external provider, cached per account.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub account_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub token_type: String,
    pub provider: Provider,
}

/// Stored refresh token. Only the SHA-256 hash of the secret is persisted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Caller metadata recorded alongside refresh tokens and security events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject, the user ID in decimal.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verified identity returned by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: Provider,
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("email".parse::<Provider>().unwrap(), Provider::Email);
        assert!("github".parse::<Provider>().is_err());
    }

    #[test]
    fn user_json_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: 12,
            email: "alice@example.com".into(),
            name: Some("Alice".into()),
            password_hash: Some("$2b$10$secret".into()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "12");
        assert!(json.get("password_hash").is_none());
    }
}
