//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ridash_core::auth::AuthError;
use ridash_core::docmanager::DocManagerError;
use ridash_core::docs::DocsError;
use ridash_core::id::IdError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Upstream(m) => (StatusCode::BAD_GATEWAY, "upstream_error", m.as_str()),
            AppError::UpstreamUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable", m.as_str())
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<IdError> for AppError {
    fn from(e: IdError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::Unauthorized("Invalid credentials".into()),
            // The reason stays in the logs; callers only learn the token is unusable.
            AuthError::RefreshRejected(_) => {
                AppError::Unauthorized("Invalid or expired refresh token".into())
            }
            AuthError::TokenError(msg) => AppError::Internal(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::Conflict(msg) => AppError::Conflict(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::IdError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<DocsError> for AppError {
    fn from(e: DocsError) -> Self {
        match e {
            DocsError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            DocsError::Forbidden(msg) => AppError::Forbidden(msg),
            DocsError::ValidationError(msg) => AppError::Validation(msg),
            DocsError::Conflict(msg) => AppError::Conflict(msg),
            DocsError::DbError(e) => AppError::from(e),
            DocsError::IdError(e) => AppError::from(e),
        }
    }
}

impl From<DocManagerError> for AppError {
    fn from(e: DocManagerError) -> Self {
        match e {
            DocManagerError::NotFound => AppError::NotFound("document not found".into()),
            DocManagerError::Unavailable(_)
            | DocManagerError::Upstream { .. }
            | DocManagerError::Decode(_) => {
                error!(error = %e, "document manager request failed");
                AppError::Upstream("document service unavailable".into())
            }
            DocManagerError::Config(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use ridash_core::auth::RefreshFailure;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let response = AppError::Internal("connection refused on 10.0.0.5".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn every_refresh_failure_is_the_same_401() {
        let mut bodies = Vec::new();
        for reason in [
            RefreshFailure::NotFound,
            RefreshFailure::Replay,
            RefreshFailure::Expired,
        ] {
            let response = AppError::from(AuthError::RefreshRejected(reason)).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(body_json(response).await);
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::from(DocManagerError::NotFound), StatusCode::NOT_FOUND),
            (
                AppError::from(DocManagerError::Upstream { status: 500 }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::UpstreamUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::from(DocsError::NotFound("share")),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
