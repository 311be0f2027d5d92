//! In-memory [`AuthStore`] for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::AuthError;
use super::store::{AuthStore, NewAccount, NewUser};
use crate::models::auth::{Account, ClientInfo, OAuthToken, Provider, RefreshToken, User};

/// Cheaply cloneable; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<i64, User>>,
    accounts: Arc<DashMap<(Provider, String), Account>>,
    oauth_tokens: Arc<DashMap<i64, OAuthToken>>,
    refresh_tokens: Arc<DashMap<String, RefreshToken>>,
    next_oauth_token_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oauth_token_count(&self) -> usize {
        self.oauth_tokens.len()
    }

    pub fn refresh_token_count(&self, user_id: i64) -> usize {
        self.refresh_tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count()
    }

    /// Shift a stored token's `created_at`, for expiry tests.
    pub fn backdate_refresh_token(&self, token_hash: &str, created_at: DateTime<Utc>) {
        if let Some(mut row) = self.refresh_tokens.get_mut(token_hash) {
            row.created_at = created_at;
        }
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn insert_user(&mut self, user: NewUser<'_>) -> Result<User, AuthError> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::Conflict("email already registered".into()));
        }
        let now = Utc::now();
        let row = User {
            id: user.id,
            email: user.email.to_string(),
            name: user.name.map(str::to_string),
            password_hash: user.password_hash.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_account(
        &mut self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<Account>, AuthError> {
        Ok(self
            .accounts
            .get(&(provider, provider_user_id.to_string()))
            .map(|a| a.clone()))
    }

    async fn insert_account(&mut self, account: NewAccount<'_>) -> Result<Account, AuthError> {
        let row = Account {
            id: account.id,
            user_id: account.user_id,
            provider: account.provider,
            provider_user_id: account.provider_user_id.to_string(),
            email: account.email.map(str::to_string),
            created_at: Utc::now(),
        };
        self.accounts
            .insert((row.provider, row.provider_user_id.clone()), row.clone());
        Ok(row)
    }

    async fn insert_oauth_token(&mut self, token: &OAuthToken) -> Result<(), AuthError> {
        let id = self.next_oauth_token_id.fetch_add(1, Ordering::SeqCst);
        self.oauth_tokens.insert(id, token.clone());
        Ok(())
    }

    async fn insert_refresh_token(
        &mut self,
        id: i64,
        user_id: i64,
        token_hash: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        self.refresh_tokens.insert(
            token_hash.to_string(),
            RefreshToken {
                id,
                user_id,
                token_hash: token_hash.to_string(),
                user_agent: client.user_agent.clone(),
                ip: client.ip.clone(),
                used_at: None,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AuthError> {
        Ok(self.refresh_tokens.get(token_hash).map(|t| t.clone()))
    }

    async fn mark_refresh_token_used(
        &mut self,
        id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        // The shard write lock held by iter_mut makes check-and-set atomic.
        for mut row in self.refresh_tokens.iter_mut() {
            if row.id == id {
                if row.used_at.is_some() {
                    return Ok(false);
                }
                row.used_at = Some(used_at);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
