//! Share handlers. All of them are limited to the document's manager.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ridash_core::models::docs::DocsShare;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateShareRequest, UpdateShareRequest};
use crate::services::documents;

pub async fn list_shares_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_id): Path<i64>,
) -> AppResult<Json<Vec<DocsShare>>> {
    Ok(Json(documents::list_shares(&state, user.user_id, document_id).await?))
}

pub async fn create_share_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_id): Path<i64>,
    Json(body): Json<CreateShareRequest>,
) -> AppResult<(StatusCode, Json<DocsShare>)> {
    let share =
        documents::create_share(&state, user.user_id, document_id, body.user_id, body.roles)
            .await?;
    Ok((StatusCode::CREATED, Json(share)))
}

pub async fn update_share_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((document_id, share_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateShareRequest>,
) -> AppResult<Json<DocsShare>> {
    let share =
        documents::update_share(&state, user.user_id, document_id, share_id, body.roles).await?;
    Ok(Json(share))
}

pub async fn delete_share_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((document_id, share_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    documents::delete_share(&state, user.user_id, document_id, share_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
