//! Reconciles a verified external identity with local users and accounts.

use chrono::{DateTime, Utc};
use tracing::info;

use super::AuthError;
use super::store::{AuthStore, NewAccount, NewUser};
use super::tokens::{AccessToken, TokenIssuer};
use crate::id::IdGenerator;
use crate::models::auth::{ClientInfo, ExternalIdentity, OAuthToken};

/// Which path the callback took. Every variant carries the local user and
/// the account bound to the external identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The identity was already linked; plain sign-in.
    Login { user_id: i64, account_id: i64 },
    /// The identity was bound to the signed-in user that started the flow.
    Linked { user_id: i64, account_id: i64 },
    /// A new user and account were created.
    Registered { user_id: i64, account_id: i64 },
}

impl LinkOutcome {
    pub fn user_id(&self) -> i64 {
        match *self {
            LinkOutcome::Login { user_id, .. }
            | LinkOutcome::Linked { user_id, .. }
            | LinkOutcome::Registered { user_id, .. } => user_id,
        }
    }

    pub fn account_id(&self) -> i64 {
        match *self {
            LinkOutcome::Login { account_id, .. }
            | LinkOutcome::Linked { account_id, .. }
            | LinkOutcome::Registered { account_id, .. } => account_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LinkOutcome::Login { .. } => "login",
            LinkOutcome::Linked { .. } => "linked",
            LinkOutcome::Registered { .. } => "registered",
        }
    }
}

/// Tokens returned by the provider's code exchange.
#[derive(Debug, Clone)]
pub struct ProviderGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub token_type: String,
}

/// Everything the callback needs to finish the response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub outcome: LinkOutcome,
    pub access_token: AccessToken,
    pub refresh_token: String,
}

/// Decide between login, link and registration, creating rows as needed.
pub async fn resolve<S>(
    store: &mut S,
    ids: &dyn IdGenerator,
    identity: &ExternalIdentity,
    link_subject: Option<i64>,
) -> Result<LinkOutcome, AuthError>
where
    S: AuthStore + ?Sized,
{
    if let Some(account) = store
        .find_account(identity.provider, &identity.subject)
        .await?
    {
        if let Some(subject) = link_subject
            && subject != account.user_id
        {
            return Err(AuthError::Conflict(format!(
                "{} account is already linked to another user",
                identity.provider
            )));
        }
        return Ok(LinkOutcome::Login {
            user_id: account.user_id,
            account_id: account.id,
        });
    }

    if let Some(subject) = link_subject {
        let Some(user) = store.find_user_by_id(subject).await? else {
            return Err(AuthError::Forbidden("linking user no longer exists".into()));
        };
        let account = store
            .insert_account(NewAccount {
                id: ids.next_id()?,
                user_id: user.id,
                provider: identity.provider,
                provider_user_id: &identity.subject,
                email: Some(&identity.email),
            })
            .await?;
        return Ok(LinkOutcome::Linked {
            user_id: user.id,
            account_id: account.id,
        });
    }

    if store.find_user_by_email(&identity.email).await?.is_some() {
        return Err(AuthError::Conflict(
            "email already registered; sign in to link this provider".into(),
        ));
    }

    let user = store
        .insert_user(NewUser {
            id: ids.next_id()?,
            email: &identity.email,
            name: identity.name.as_deref(),
            password_hash: None,
        })
        .await?;
    let account = store
        .insert_account(NewAccount {
            id: ids.next_id()?,
            user_id: user.id,
            provider: identity.provider,
            provider_user_id: &identity.subject,
            email: Some(&identity.email),
        })
        .await?;
    Ok(LinkOutcome::Registered {
        user_id: user.id,
        account_id: account.id,
    })
}

/// Resolve the identity, cache the provider tokens and issue our own.
///
/// All writes go through `store`; the caller commits them as one unit.
pub async fn complete<S>(
    store: &mut S,
    issuer: &TokenIssuer,
    identity: &ExternalIdentity,
    grant: &ProviderGrant,
    link_subject: Option<i64>,
    client: &ClientInfo,
) -> Result<Completion, AuthError>
where
    S: AuthStore + ?Sized,
{
    let outcome = resolve(store, issuer.ids(), identity, link_subject).await?;
    if outcome.user_id() == 0 {
        return Err(AuthError::Internal(format!(
            "oauth {} resolved to user 0",
            outcome.kind()
        )));
    }

    store
        .insert_oauth_token(&OAuthToken {
            account_id: outcome.account_id(),
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            expiry: grant.expiry,
            token_type: grant.token_type.clone(),
            provider: identity.provider,
        })
        .await?;

    let refresh_token = issuer
        .issue_refresh_token(store, outcome.user_id(), client)
        .await?;
    let access_token = issuer.issue_access_token(outcome.user_id())?;

    info!(
        user_id = outcome.user_id(),
        provider = %identity.provider,
        outcome = outcome.kind(),
        "oauth sign-in completed"
    );
    Ok(Completion {
        outcome,
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::AuthConfig;
    use crate::auth::memory::MemoryStore;
    use crate::id::Snowflake;
    use crate::models::auth::Provider;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            AuthConfig::new("ridash", "linker-key"),
            Arc::new(Snowflake::new(2).unwrap()),
        )
    }

    fn identity(subject: &str, email: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: Provider::Google,
            subject: subject.into(),
            email: email.into(),
            name: Some("Ext User".into()),
        }
    }

    fn grant() -> ProviderGrant {
        ProviderGrant {
            access_token: "ya29.token".into(),
            refresh_token: Some("1//refresh".into()),
            expiry: None,
            token_type: "Bearer".into(),
        }
    }

    async fn seed_user(store: &mut MemoryStore, id: i64, email: &str) {
        store
            .insert_user(NewUser {
                id,
                email,
                name: None,
                password_hash: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn new_identity_registers_user_and_account() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        let ext = identity("g-1", "new@example.com");

        let done = complete(&mut store, &issuer, &ext, &grant(), None, &ClientInfo::default())
            .await
            .unwrap();

        assert!(matches!(done.outcome, LinkOutcome::Registered { .. }));
        let user = store
            .find_user_by_email("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, done.outcome.user_id());
        assert!(user.password_hash.is_none());
        assert_eq!(store.oauth_token_count(), 1);
        assert_eq!(store.refresh_token_count(user.id), 1);
        assert_eq!(
            issuer.verify_access_token(&done.access_token.token),
            Some(user.id)
        );
    }

    #[tokio::test]
    async fn known_identity_logs_in() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        let ext = identity("g-2", "repeat@example.com");
        let first = complete(&mut store, &issuer, &ext, &grant(), None, &ClientInfo::default())
            .await
            .unwrap();

        let second = complete(&mut store, &issuer, &ext, &grant(), None, &ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(
            second.outcome,
            LinkOutcome::Login {
                user_id: first.outcome.user_id(),
                account_id: first.outcome.account_id(),
            }
        );
        assert_eq!(store.oauth_token_count(), 2);
    }

    #[tokio::test]
    async fn link_subject_binds_identity_to_existing_user() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        seed_user(&mut store, 500, "alice@example.com").await;
        let ext = identity("g-3", "alice.other@gmail.com");

        let outcome = resolve(&mut store, issuer.ids(), &ext, Some(500))
            .await
            .unwrap();

        assert!(matches!(outcome, LinkOutcome::Linked { user_id: 500, .. }));
        let account = store
            .find_account(Provider::Google, "g-3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.user_id, 500);
    }

    #[tokio::test]
    async fn relinking_to_same_user_is_a_login() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        seed_user(&mut store, 500, "alice@example.com").await;
        let ext = identity("g-4", "alice@gmail.com");
        resolve(&mut store, issuer.ids(), &ext, Some(500))
            .await
            .unwrap();

        let again = resolve(&mut store, issuer.ids(), &ext, Some(500))
            .await
            .unwrap();
        assert!(matches!(again, LinkOutcome::Login { user_id: 500, .. }));
    }

    #[tokio::test]
    async fn identity_owned_by_someone_else_conflicts() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        seed_user(&mut store, 500, "alice@example.com").await;
        seed_user(&mut store, 600, "bob@example.com").await;
        let ext = identity("g-5", "shared@gmail.com");
        resolve(&mut store, issuer.ids(), &ext, Some(500))
            .await
            .unwrap();

        let err = resolve(&mut store, issuer.ids(), &ext, Some(600))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_link_subject_is_forbidden() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        let err = resolve(&mut store, issuer.ids(), &identity("g-6", "x@example.com"), Some(999))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
        assert!(
            store
                .find_account(Provider::Google, "g-6")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn registration_with_taken_email_conflicts() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        seed_user(&mut store, 700, "taken@example.com").await;

        let err = resolve(&mut store, issuer.ids(), &identity("g-7", "taken@example.com"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn zero_user_id_is_internal_error() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        seed_user(&mut store, 0, "zero@example.com").await;
        let ext = identity("g-8", "zero@gmail.com");

        let err = complete(&mut store, &issuer, &ext, &grant(), Some(0), &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert_eq!(store.oauth_token_count(), 0);
    }
}
