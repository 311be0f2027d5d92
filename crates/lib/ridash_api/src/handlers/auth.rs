//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use ridash_core::models::auth::User;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::client::ClientMeta;
use crate::models::{LoginRequest, LogoutResponse, RegisterRequest, TokenResponse};
use crate::services::{auth, cookies};

/// `POST /auth/register`: create a password account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = auth::register(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /auth/login`: check credentials and set the refresh cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let result = auth::login(&state, &body.email, &body.password, &client).await?;
    let access = state.issuer.issue_access_token(result.user_id)?;
    let cookie = cookies::refresh_cookie(
        &state.config.cookies,
        &result.refresh_token,
        state.config.auth.refresh_ttl,
    );
    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            access_token: access.token,
            token_type: "Bearer".into(),
            expires_in: access.expires_in,
        }),
    ))
}

/// `POST /auth/refresh`: rotate the refresh cookie and mint an access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ClientMeta(client): ClientMeta,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar, Json<TokenResponse>)> {
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))?;

    let rotated = auth::refresh(&state, &presented, &client).await?;
    let cookie = cookies::refresh_cookie(
        &state.config.cookies,
        &rotated.refresh_token,
        state.config.auth.refresh_ttl,
    );
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(auth::token_response(&rotated)),
    ))
}

/// `POST /auth/logout`: retire the refresh token and clear the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let presented = jar.get(cookies::REFRESH_COOKIE).map(|c| c.value().to_string());
    auth::logout(&state, presented.as_deref()).await?;
    Ok((
        jar.add(cookies::clear_refresh_cookie(&state.config.cookies)),
        Json(LogoutResponse { success: true }),
    ))
}
