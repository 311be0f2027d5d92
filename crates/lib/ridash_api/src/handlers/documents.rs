//! Document handlers.
//!
//! Reads go through optional auth so public documents are visible to
//! anonymous callers; writes require a signed-in manager.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ridash_core::models::docs::Document;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateDocumentRequest, DocumentResponse, UpdateDocumentRequest};
use crate::services::documents;

fn requester(user: Option<Extension<AuthenticatedUser>>) -> Option<i64> {
    user.map(|Extension(u)| u.user_id)
}

/// `POST /documents`
pub async fn create_document_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<Document>)> {
    let document = documents::create_document(&state, user.user_id, &body).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /documents`: everything the caller may read.
pub async fn list_documents_handler(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(documents::list_documents(&state, requester(user)).await?))
}

/// `GET /documents/{id}`
pub async fn get_document_handler(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Path(document_id): Path<i64>,
) -> AppResult<Json<DocumentResponse>> {
    let document = documents::get_document(&state, requester(user), document_id).await?;
    Ok(Json(document))
}

/// `PUT /documents/{id}`
pub async fn update_document_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_id): Path<i64>,
    Json(body): Json<UpdateDocumentRequest>,
) -> AppResult<Json<Document>> {
    let document = documents::update_document(&state, user.user_id, document_id, &body).await?;
    Ok(Json(document))
}

/// `DELETE /documents/{id}`
pub async fn delete_document_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(document_id): Path<i64>,
) -> AppResult<StatusCode> {
    documents::delete_document(&state, user.user_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
