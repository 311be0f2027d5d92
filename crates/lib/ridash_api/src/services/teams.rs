//! Team and folder service. Only a team's owner may change the team or its
//! folders; members may read them.

use ridash_core::docs::{self, MAX_NAME_LEN, MAX_TEAM_NAME_LEN, queries};
use ridash_core::models::docs::{Folder, Team};
use sqlx::PgConnection;
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};

async fn load_team(conn: &mut PgConnection, team_id: i64) -> AppResult<Team> {
    queries::get_team(conn, team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))
}

async fn load_owned_team(conn: &mut PgConnection, team_id: i64, user_id: i64) -> AppResult<Team> {
    let team = load_team(conn, team_id).await?;
    if team.owner_id != user_id {
        return Err(AppError::Forbidden("Only the team owner can do this".into()));
    }
    Ok(team)
}

async fn load_visible_team(
    conn: &mut PgConnection,
    team_id: i64,
    user_id: i64,
) -> AppResult<Team> {
    let team = load_team(conn, team_id).await?;
    if team.owner_id != user_id && !queries::is_team_member(conn, team_id, user_id).await? {
        return Err(AppError::Forbidden("Not a member of this team".into()));
    }
    Ok(team)
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

pub async fn create_team(state: &AppState, user_id: i64, name: &str) -> AppResult<Team> {
    let name = docs::validate_name("name", name, MAX_TEAM_NAME_LEN)?;
    let mut tx = state.pool.begin().await?;
    let team = queries::create_team(&mut tx, state.issuer.ids(), user_id, &name).await?;
    tx.commit().await?;
    info!(team_id = team.id, user_id, "team created");
    Ok(team)
}

pub async fn list_teams(state: &AppState, user_id: i64) -> AppResult<Vec<Team>> {
    let mut conn = state.pool.acquire().await?;
    Ok(queries::list_teams_for_user(&mut conn, user_id).await?)
}

pub async fn get_team(state: &AppState, user_id: i64, team_id: i64) -> AppResult<Team> {
    let mut conn = state.pool.acquire().await?;
    load_visible_team(&mut conn, team_id, user_id).await
}

pub async fn update_team(
    state: &AppState,
    user_id: i64,
    team_id: i64,
    name: &str,
) -> AppResult<Team> {
    let name = docs::validate_name("name", name, MAX_TEAM_NAME_LEN)?;
    let mut tx = state.pool.begin().await?;
    load_owned_team(&mut tx, team_id, user_id).await?;
    let team = queries::update_team(&mut tx, team_id, &name).await?;
    tx.commit().await?;
    Ok(team)
}

/// Delete a team with everything in it. Document content held by the
/// document manager is dropped after the commit, best effort.
pub async fn delete_team(state: &AppState, user_id: i64, team_id: i64) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;
    load_owned_team(&mut tx, team_id, user_id).await?;
    let document_ids = queries::list_team_document_ids(&mut tx, team_id).await?;
    queries::delete_team(&mut tx, team_id).await?;
    tx.commit().await?;
    info!(team_id, user_id, documents = document_ids.len(), "team deleted");

    drop_content(state, document_ids).await;
    Ok(())
}

/// Best effort: the metadata is already gone, so failures are only logged.
async fn drop_content(state: &AppState, document_ids: Vec<i64>) {
    let Some(manager) = &state.doc_manager else {
        return;
    };
    for document_id in document_ids {
        if let Err(e) = manager.delete_document(document_id).await {
            warn!(document_id, error = %e, "failed to drop content of deleted document");
        }
    }
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

/// Check that `parent` exists in `team_id` and would not create a cycle
/// under `folder_id`.
async fn check_parent(
    conn: &mut PgConnection,
    team_id: i64,
    folder_id: Option<i64>,
    parent: Option<i64>,
) -> AppResult<()> {
    let Some(parent) = parent else {
        return Ok(());
    };
    if Some(parent) == folder_id {
        return Err(AppError::Validation("A folder cannot be its own parent".into()));
    }
    let parent_folder = queries::get_folder(conn, parent)
        .await?
        .ok_or_else(|| AppError::NotFound("Parent folder not found".into()))?;
    if parent_folder.team_id != team_id {
        return Err(AppError::Validation(
            "Parent folder must belong to the same team".into(),
        ));
    }
    if let Some(folder_id) = folder_id
        && queries::is_descendant_of(conn, parent, folder_id).await?
    {
        return Err(AppError::Validation(
            "A folder cannot be moved under its own descendant".into(),
        ));
    }
    Ok(())
}

async fn load_team_folder(
    conn: &mut PgConnection,
    team_id: i64,
    folder_id: i64,
) -> AppResult<Folder> {
    queries::get_folder(conn, folder_id)
        .await?
        .filter(|f| f.team_id == team_id)
        .ok_or_else(|| AppError::NotFound("Folder not found".into()))
}

pub async fn create_folder(
    state: &AppState,
    user_id: i64,
    team_id: i64,
    name: &str,
    parent: Option<i64>,
) -> AppResult<Folder> {
    let name = docs::validate_name("name", name, MAX_NAME_LEN)?;
    let mut tx = state.pool.begin().await?;
    load_owned_team(&mut tx, team_id, user_id).await?;
    check_parent(&mut tx, team_id, None, parent).await?;
    let folder = queries::create_folder(&mut tx, state.issuer.ids(), team_id, &name, parent).await?;
    tx.commit().await?;
    Ok(folder)
}

pub async fn list_folders(state: &AppState, user_id: i64, team_id: i64) -> AppResult<Vec<Folder>> {
    let mut conn = state.pool.acquire().await?;
    load_visible_team(&mut conn, team_id, user_id).await?;
    Ok(queries::list_folders(&mut conn, team_id).await?)
}

pub async fn get_folder(
    state: &AppState,
    user_id: i64,
    team_id: i64,
    folder_id: i64,
) -> AppResult<Folder> {
    let mut conn = state.pool.acquire().await?;
    load_visible_team(&mut conn, team_id, user_id).await?;
    load_team_folder(&mut conn, team_id, folder_id).await
}

pub async fn update_folder(
    state: &AppState,
    user_id: i64,
    team_id: i64,
    folder_id: i64,
    name: &str,
    parent: Option<i64>,
) -> AppResult<Folder> {
    let name = docs::validate_name("name", name, MAX_NAME_LEN)?;
    let mut tx = state.pool.begin().await?;
    load_owned_team(&mut tx, team_id, user_id).await?;
    load_team_folder(&mut tx, team_id, folder_id).await?;
    check_parent(&mut tx, team_id, Some(folder_id), parent).await?;
    let folder = queries::update_folder(&mut tx, folder_id, &name, parent).await?;
    tx.commit().await?;
    Ok(folder)
}

/// Delete a folder with its sub-folders and documents. Document content is
/// dropped after the commit, as for [`delete_team`].
pub async fn delete_folder(
    state: &AppState,
    user_id: i64,
    team_id: i64,
    folder_id: i64,
) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;
    load_owned_team(&mut tx, team_id, user_id).await?;
    load_team_folder(&mut tx, team_id, folder_id).await?;
    let document_ids = queries::list_folder_document_ids(&mut tx, folder_id).await?;
    queries::delete_folder(&mut tx, folder_id).await?;
    tx.commit().await?;
    info!(folder_id, team_id, documents = document_ids.len(), "folder deleted");

    drop_content(state, document_ids).await;
    Ok(())
}
