//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

fn bearer_token(request: &Request) -> Result<Option<&str>, AppError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))
}

fn authenticate(state: &AppState, token: &str) -> Result<AuthenticatedUser, AppError> {
    state
        .issuer
        .verify_access_token(token)
        .map(|user_id| AuthenticatedUser { user_id })
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))
}

/// Reject requests without a valid `Authorization: Bearer <token>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;
    let user = authenticate(&state, token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Attach the caller when a token is present; anonymous requests pass.
///
/// A token that is present but invalid is still rejected, so a client with
/// an expired session learns to refresh instead of silently going anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(&request)? {
        let user = authenticate(&state, token)?;
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}
