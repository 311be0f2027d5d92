//! Auth-related database queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::AuthError;
use super::store::{AuthStore, NewAccount, NewUser};
use crate::models::auth::{Account, ClientInfo, OAuthToken, Provider, RefreshToken, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";
const ACCOUNT_COLUMNS: &str = "id, user_id, provider, provider_user_id, email, created_at";

/// Map a unique-constraint violation to [`AuthError::Conflict`].
fn conflict_on_unique(e: sqlx::Error, what: &str) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(format!("{what} already exists"))
        }
        _ => AuthError::DbError(e),
    }
}

#[async_trait]
impl AuthStore for PgConnection {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: NewUser<'_>) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, name, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email)
        .bind(user.name)
        .bind(user.password_hash)
        .fetch_one(&mut *self)
        .await
        .map_err(|e| conflict_on_unique(e, "user with this email"))
    }

    async fn find_account(
        &mut self,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE provider = $1 AND provider_user_id = $2"
        ))
        .bind(provider)
        .bind(provider_user_id)
        .fetch_optional(&mut *self)
        .await?;
        Ok(account)
    }

    async fn insert_account(&mut self, account: NewAccount<'_>) -> Result<Account, AuthError> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, user_id, provider, provider_user_id, email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account.id)
        .bind(account.user_id)
        .bind(account.provider)
        .bind(account.provider_user_id)
        .bind(account.email)
        .fetch_one(&mut *self)
        .await
        .map_err(|e| conflict_on_unique(e, "account"))
    }

    async fn insert_oauth_token(&mut self, token: &OAuthToken) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO oauth_tokens \
             (account_id, access_token, refresh_token, expiry, token_type, provider) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(token.account_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expiry)
        .bind(&token.token_type)
        .bind(token.provider)
        .execute(&mut *self)
        .await?;
        Ok(())
    }

    async fn insert_refresh_token(
        &mut self,
        id: i64,
        user_id: i64,
        token_hash: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, user_agent, ip) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(&client.user_agent)
        .bind(&client.ip)
        .execute(&mut *self)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AuthError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, user_agent, ip, used_at, created_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&mut *self)
        .await?;
        Ok(row)
    }

    async fn mark_refresh_token_used(
        &mut self,
        id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET used_at = $2 WHERE id = $1 AND used_at IS NULL")
                .bind(id)
                .bind(used_at)
                .execute(&mut *self)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}
