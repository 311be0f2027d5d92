//! OAuth entry and callback handlers.
//!
//! The entry leg signs a state into the `oauth_session` cookie and sends
//! the browser to the provider. The callback leg checks the returned nonce
//! against that cookie before touching the provider or the database.

use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use ridash_core::models::auth::{ClientInfo, Provider};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::client::ClientMeta;
use crate::models::{OAuthCallbackQuery, OAuthEntryQuery};
use crate::services::oauth::OAuthProviderClient;
use crate::services::{auth, cookies};

fn provider_client<'a>(state: &'a AppState, raw: &str) -> AppResult<&'a OAuthProviderClient> {
    let provider: Provider = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("Unknown provider: {raw}")))?;
    state
        .providers
        .get(&provider)
        .ok_or_else(|| AppError::Validation(format!("Provider not enabled: {provider}")))
}

/// Only same-origin paths are accepted as post-login targets.
fn validate_next(next: Option<String>) -> AppResult<String> {
    let next = next.unwrap_or_else(|| "/".into());
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        Ok(next)
    } else {
        Err(AppError::Validation("next must be a relative path".into()))
    }
}

/// `GET /auth/oauth/{provider}`: start the provider handshake.
///
/// A signed-in caller links the provider to their account instead of
/// signing in with it.
pub async fn oauth_entry_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthEntryQuery>,
    user: Option<Extension<AuthenticatedUser>>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let client = provider_client(&state, &provider)?;
    let next = validate_next(query.next)?;
    let link_subject = user.map(|Extension(u)| u.user_id);

    let encoded = state.oauth_state.issue(&next, link_subject)?;
    let cookie = cookies::oauth_session_cookie(
        &state.config.cookies,
        &encoded.cookie_value,
        state.oauth_state.ttl(),
    );
    let location = client.authorize_url(&encoded.nonce);
    Ok((jar.add(cookie), Redirect::temporary(location.as_str())))
}

/// `GET /auth/oauth/{provider}/callback`: finish the handshake.
///
/// The state cookie is single use: it is cleared whether the handshake
/// succeeds or not.
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    ClientMeta(client_info): ClientMeta,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), (CookieJar, AppError)> {
    let session = jar
        .get(cookies::OAUTH_SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let jar = jar.add(cookies::clear_oauth_session_cookie(&state.config.cookies));

    match finish_callback(&state, &provider, query, &client_info, session).await {
        Ok((refresh_token, redirect_uri)) => {
            let cookie = cookies::refresh_cookie(
                &state.config.cookies,
                &refresh_token,
                state.config.auth.refresh_ttl,
            );
            Ok((jar.add(cookie), Redirect::temporary(&redirect_uri)))
        }
        Err(e) => Err((jar, e)),
    }
}

/// Returns the new refresh token and the post-login redirect.
async fn finish_callback(
    state: &AppState,
    provider: &str,
    query: OAuthCallbackQuery,
    client_info: &ClientInfo,
    session: Option<String>,
) -> AppResult<(String, String)> {
    let session = session.ok_or_else(|| AppError::Validation("Missing OAuth session".into()))?;
    let client = provider_client(state, provider)?;
    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Err(AppError::Validation("code and state are required".into()));
    };

    let oauth_state = state
        .oauth_state
        .verify(&session, &returned_state)
        .inspect_err(|e| {
            warn!(
                provider = %client.provider(),
                ip = client_info.ip.as_deref().unwrap_or("-"),
                user_agent = client_info.user_agent.as_deref().unwrap_or("-"),
                error = %e,
                "rejected oauth callback"
            );
        })?;

    let grant = client.exchange_code(&code).await?;
    let identity = client.fetch_identity(&grant.access_token).await?;
    let completion = auth::complete_oauth(
        state,
        &identity,
        &grant,
        oauth_state.link_subject,
        client_info,
    )
    .await?;
    info!(
        provider = %client.provider(),
        user_id = completion.outcome.user_id(),
        outcome = completion.outcome.kind(),
        "oauth sign-in completed"
    );
    Ok((completion.refresh_token, oauth_state.redirect_uri))
}
