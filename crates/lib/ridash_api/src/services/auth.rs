//! Authentication service: owns the transaction around each auth flow and
//! delegates the logic to `ridash_core::auth`.

use ridash_core::auth::linker::{self, Completion, ProviderGrant};
use ridash_core::auth::password::{hash_password, verify_credentials};
use ridash_core::auth::rotation::{self, Rotated};
use ridash_core::auth::store::{AuthStore, NewAccount, NewUser};
use ridash_core::models::auth::{ClientInfo, ExternalIdentity, Provider, User};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterRequest, TokenResponse};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 255;
const MAX_USER_NAME_LEN: usize = 255;

/// Outcome of a password login.
pub struct LoginResult {
    pub user_id: i64,
    pub refresh_token: String,
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.len() > 255 || email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    Ok(email)
}

fn validate_registration(body: &RegisterRequest) -> AppResult<(String, String)> {
    let email = normalize_email(&body.email)?;
    let password_len = body.password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(AppError::Validation(format!(
            "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
        )));
    }
    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > MAX_USER_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be between 1 and {MAX_USER_NAME_LEN} characters"
        )));
    }
    Ok((email, name.to_string()))
}

/// Create a password user plus its `email` provider account.
pub async fn register(state: &AppState, body: &RegisterRequest) -> AppResult<User> {
    let (email, name) = validate_registration(body)?;
    let password_hash = hash_password(&body.password)?;
    let ids = state.issuer.ids();

    let mut tx = state.pool.begin().await?;
    if tx.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }
    let user = tx
        .insert_user(NewUser {
            id: ids.next_id()?,
            email: &email,
            name: Some(&name),
            password_hash: Some(&password_hash),
        })
        .await?;
    tx.insert_account(NewAccount {
        id: ids.next_id()?,
        user_id: user.id,
        provider: Provider::Email,
        provider_user_id: &email,
        email: Some(&email),
    })
    .await?;
    tx.commit().await?;

    info!(user_id = user.id, "user registered");
    Ok(user)
}

/// Check email and password, then issue a refresh token bound to `client`.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    client: &ClientInfo,
) -> AppResult<LoginResult> {
    // Malformed emails cannot match a stored user; answer like a wrong password.
    let email = normalize_email(email)
        .map_err(|_| AppError::Unauthorized("Invalid credentials".into()))?;

    let mut tx = state.pool.begin().await?;
    let user = tx.find_user_by_email(&email).await?;
    let user_id = verify_credentials(user.as_ref(), password)?;
    let refresh_token = state
        .issuer
        .issue_refresh_token(&mut *tx, user_id, client)
        .await?;
    tx.commit().await?;

    info!(user_id, ip = client.ip.as_deref().unwrap_or("-"), "login successful");
    Ok(LoginResult {
        user_id,
        refresh_token,
    })
}

/// Rotate a refresh token.
pub async fn refresh(state: &AppState, presented: &str, client: &ClientInfo) -> AppResult<Rotated> {
    let mut tx = state.pool.begin().await?;
    let rotated = rotation::redeem(&mut *tx, &state.issuer, presented, client).await?;
    tx.commit().await?;
    Ok(rotated)
}

/// Retire a refresh token. Unknown tokens are ignored.
pub async fn logout(state: &AppState, presented: Option<&str>) -> AppResult<()> {
    let Some(presented) = presented.filter(|t| !t.is_empty()) else {
        return Ok(());
    };
    let mut tx = state.pool.begin().await?;
    rotation::revoke(&mut *tx, presented).await?;
    tx.commit().await?;
    Ok(())
}

/// Run the account linker and issue tokens, all in one transaction.
pub async fn complete_oauth(
    state: &AppState,
    identity: &ExternalIdentity,
    grant: &ProviderGrant,
    link_subject: Option<i64>,
    client: &ClientInfo,
) -> AppResult<Completion> {
    let mut tx = state.pool.begin().await?;
    let completion = linker::complete(
        &mut *tx,
        &state.issuer,
        identity,
        grant,
        link_subject,
        client,
    )
    .await?;
    tx.commit().await?;
    Ok(completion)
}

/// Token response body for a rotated pair.
pub fn token_response(rotated: &Rotated) -> TokenResponse {
    TokenResponse {
        access_token: rotated.access_token.token.clone(),
        token_type: "Bearer".into(),
        expires_in: rotated.access_token.expires_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        for bad in ["", "alice", "@example.com", "alice@example", "a b@example.com", "a@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&request("a@example.com", "password1", "Alice")).is_ok());
        assert!(validate_registration(&request("a@example.com", "short", "Alice")).is_err());
        assert!(validate_registration(&request("a@example.com", "password1", "  ")).is_err());
        assert!(
            validate_registration(&request("a@example.com", &"p".repeat(256), "Alice")).is_err()
        );
    }
}
