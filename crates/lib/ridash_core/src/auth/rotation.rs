//! Single-use refresh token rotation with replay detection.

use chrono::Utc;
use tracing::{info, warn};

use super::store::AuthStore;
use super::tokens::{AccessToken, TokenIssuer, hash_refresh_token};
use super::{AuthError, RefreshFailure};
use crate::models::auth::ClientInfo;

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct Rotated {
    pub user_id: i64,
    pub access_token: AccessToken,
    /// Plaintext of the replacement refresh token.
    pub refresh_token: String,
}

/// Redeem a presented refresh token for a new access/refresh pair.
///
/// The presented token is marked used with a conditional update, so of two
/// concurrent redemptions only one can succeed. The caller commits the
/// update and the new token row together.
pub async fn redeem<S>(
    store: &mut S,
    issuer: &TokenIssuer,
    presented: &str,
    client: &ClientInfo,
) -> Result<Rotated, AuthError>
where
    S: AuthStore + ?Sized,
{
    let now = Utc::now();
    let Some(stored) = store.find_refresh_token(&hash_refresh_token(presented)).await? else {
        return Err(AuthError::RefreshRejected(RefreshFailure::NotFound));
    };

    if stored.used_at.is_some() {
        report_replay(stored.user_id, client);
        return Err(AuthError::RefreshRejected(RefreshFailure::Replay));
    }

    if stored.created_at + issuer.config().refresh_ttl <= now {
        return Err(AuthError::RefreshRejected(RefreshFailure::Expired));
    }

    if !store.mark_refresh_token_used(stored.id, now).await? {
        // Lost the race against a concurrent redemption of the same token.
        report_replay(stored.user_id, client);
        return Err(AuthError::RefreshRejected(RefreshFailure::Replay));
    }

    let refresh_token = issuer
        .issue_refresh_token(store, stored.user_id, client)
        .await?;
    let access_token = issuer.issue_access_token(stored.user_id)?;

    info!(user_id = stored.user_id, "rotated refresh token");
    Ok(Rotated {
        user_id: stored.user_id,
        access_token,
        refresh_token,
    })
}

/// Mark a presented refresh token used without issuing a replacement.
///
/// Unknown or already-used tokens are ignored.
pub async fn revoke<S>(store: &mut S, presented: &str) -> Result<(), AuthError>
where
    S: AuthStore + ?Sized,
{
    if let Some(stored) = store.find_refresh_token(&hash_refresh_token(presented)).await?
        && stored.used_at.is_none()
    {
        store.mark_refresh_token_used(stored.id, Utc::now()).await?;
    }
    Ok(())
}

fn report_replay(user_id: i64, client: &ClientInfo) {
    warn!(
        user_id,
        ip = client.ip.as_deref().unwrap_or("-"),
        user_agent = client.user_agent.as_deref().unwrap_or("-"),
        "refresh token replay detected"
    );
}
