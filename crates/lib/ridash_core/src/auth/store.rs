//! Storage seam for the auth flows.
//!
//! Implemented for [`sqlx::PgConnection`] in [`super::queries`], so callers
//! pass `&mut *tx` and keep ownership of the request transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AuthError;
use crate::models::auth::{Account, ClientInfo, OAuthToken, Provider, RefreshToken, User};

/// Fields for a user row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub id: i64,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
}

/// Fields for an account row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub id: i64,
    pub user_id: i64,
    pub provider: Provider,
    pub provider_user_id: &'a str,
    pub email: Option<&'a str>,
}

#[async_trait]
pub trait AuthStore: Send {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<User>, AuthError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError>;

    async fn insert_user(&mut self, user: NewUser<'_>) -> Result<User, AuthError>;

    async fn find_account(
        &mut self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<Account>, AuthError>;

    async fn insert_account(&mut self, account: NewAccount<'_>) -> Result<Account, AuthError>;

    async fn insert_oauth_token(&mut self, token: &OAuthToken) -> Result<(), AuthError>;

    async fn insert_refresh_token(
        &mut self,
        id: i64,
        user_id: i64,
        token_hash: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError>;

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AuthError>;

    /// Set `used_at` if it is still null. Returns `false` when another
    /// redemption got there first.
    async fn mark_refresh_token_used(
        &mut self,
        id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AuthError>;
}
