//! Folder handlers, nested under a team.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ridash_core::models::docs::Folder;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::FolderRequest;
use crate::services::teams;

pub async fn create_folder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(team_id): Path<i64>,
    Json(body): Json<FolderRequest>,
) -> AppResult<(StatusCode, Json<Folder>)> {
    let folder =
        teams::create_folder(&state, user.user_id, team_id, &body.name, body.parent_folder)
            .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn list_folders_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(team_id): Path<i64>,
) -> AppResult<Json<Vec<Folder>>> {
    Ok(Json(teams::list_folders(&state, user.user_id, team_id).await?))
}

pub async fn get_folder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((team_id, folder_id)): Path<(i64, i64)>,
) -> AppResult<Json<Folder>> {
    let folder = teams::get_folder(&state, user.user_id, team_id, folder_id).await?;
    Ok(Json(folder))
}

/// `PUT /teams/{team_id}/folders/{id}`: rename or move. A missing
/// `parent_folder` moves the folder to the team root.
pub async fn update_folder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((team_id, folder_id)): Path<(i64, i64)>,
    Json(body): Json<FolderRequest>,
) -> AppResult<Json<Folder>> {
    let folder = teams::update_folder(
        &state,
        user.user_id,
        team_id,
        folder_id,
        &body.name,
        body.parent_folder,
    )
    .await?;
    Ok(Json(folder))
}

pub async fn delete_folder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((team_id, folder_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    teams::delete_folder(&state, user.user_id, team_id, folder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
