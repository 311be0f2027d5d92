//! Document and share service.
//!
//! Every operation loads one [`DocumentContext`] and asks it for the
//! decision; only the team owner of the document's folder manages it.

use ridash_core::docmanager::{DocManagerClient, DocManagerError};
use ridash_core::docs::permission::{Access, DocumentContext};
use ridash_core::docs::{self, MAX_NAME_LEN, queries};
use ridash_core::models::docs::{DocsPermission, DocsShare, Document, ShareRole};
use sqlx::PgConnection;
use tracing::{debug, info};
use url::Url;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateDocumentRequest, DocumentResponse, UpdateDocumentRequest};

async fn load_context(
    conn: &mut PgConnection,
    document_id: i64,
    requester: Option<i64>,
) -> AppResult<DocumentContext> {
    queries::load_document_context(conn, document_id, requester)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".into()))
}

fn require(ctx: &DocumentContext, requester: Option<i64>, access: Access) -> AppResult<()> {
    match ctx.grant(requester, access) {
        Some(source) => {
            debug!(document_id = ctx.document.id, ?requester, ?access, ?source, "access granted");
            Ok(())
        }
        None => Err(AppError::Forbidden(match access {
            Access::Read => "You do not have access to this document".into(),
            Access::Write => "You cannot edit this document".into(),
        })),
    }
}

fn require_manager(ctx: &DocumentContext, requester: i64) -> AppResult<()> {
    if ctx.is_manager(Some(requester)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the team owner can manage this document".into(),
        ))
    }
}

fn manager(state: &AppState) -> AppResult<&DocManagerClient> {
    state
        .doc_manager
        .as_ref()
        .ok_or_else(|| AppError::UpstreamUnavailable("document service is not configured".into()))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub async fn create_document(
    state: &AppState,
    user_id: i64,
    body: &CreateDocumentRequest,
) -> AppResult<Document> {
    let name = docs::validate_name("name", &body.name, MAX_NAME_LEN)?;
    let mut tx = state.pool.begin().await?;
    let folder = queries::get_folder(&mut tx, body.folder_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Folder not found".into()))?;
    let team = queries::get_team(&mut tx, folder.team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    if team.owner_id != user_id {
        return Err(AppError::Forbidden(
            "Only the team owner can create documents".into(),
        ));
    }
    let document = queries::create_document(
        &mut tx,
        state.issuer.ids(),
        folder.id,
        &name,
        body.permission,
    )
    .await?;
    tx.commit().await?;
    info!(document_id = document.id, user_id, "document created");
    Ok(document)
}

pub async fn list_documents(state: &AppState, requester: Option<i64>) -> AppResult<Vec<Document>> {
    let mut conn = state.pool.acquire().await?;
    Ok(queries::list_documents_for_user(&mut conn, requester).await?)
}

/// Metadata plus content. Content the manager does not have yet is left
/// out rather than failing the request.
pub async fn get_document(
    state: &AppState,
    requester: Option<i64>,
    document_id: i64,
) -> AppResult<DocumentResponse> {
    let ctx = {
        let mut conn = state.pool.acquire().await?;
        load_context(&mut conn, document_id, requester).await?
    };
    require(&ctx, requester, Access::Read)?;

    let content = match &state.doc_manager {
        Some(manager) => match manager.get_document_content(document_id).await {
            Ok(content) => Some(content),
            Err(DocManagerError::NotFound) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };
    Ok(DocumentResponse {
        document: ctx.document,
        content,
    })
}

pub async fn update_document(
    state: &AppState,
    user_id: i64,
    document_id: i64,
    body: &UpdateDocumentRequest,
) -> AppResult<Document> {
    let mut tx = state.pool.begin().await?;
    let ctx = load_context(&mut tx, document_id, Some(user_id)).await?;
    require_manager(&ctx, user_id)?;

    let name = match &body.name {
        Some(name) => docs::validate_name("name", name, MAX_NAME_LEN)?,
        None => ctx.document.name.clone(),
    };
    let permission: DocsPermission = body.permission.unwrap_or(ctx.document.permission);
    let document = queries::update_document(&mut tx, document_id, &name, permission).await?;
    tx.commit().await?;
    Ok(document)
}

/// Delete metadata and shares, and ask the manager to drop the content.
/// A manager failure other than "not found" rolls the delete back.
pub async fn delete_document(state: &AppState, user_id: i64, document_id: i64) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;
    let ctx = load_context(&mut tx, document_id, Some(user_id)).await?;
    require_manager(&ctx, user_id)?;
    queries::delete_document(&mut tx, document_id).await?;

    if let Some(manager) = &state.doc_manager {
        match manager.delete_document(document_id).await {
            Ok(()) | Err(DocManagerError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tx.commit().await?;
    info!(document_id, user_id, "document deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Editing sessions
// ---------------------------------------------------------------------------

/// Check that the caller may edit the document.
pub async fn authorize_edit(state: &AppState, user_id: i64, document_id: i64) -> AppResult<()> {
    let ctx = {
        let mut conn = state.pool.acquire().await?;
        load_context(&mut conn, document_id, Some(user_id)).await?
    };
    require(&ctx, Some(user_id), Access::Write)
}

/// Mint an edit ticket and return the websocket URL of the session.
/// Call after [`authorize_edit`].
pub async fn open_edit_session(state: &AppState, user_id: i64, document_id: i64) -> AppResult<Url> {
    let manager = manager(state)?;
    let ticket = manager.issue_ticket(document_id, user_id).await?;
    debug!(document_id, user_id, expires_at = %ticket.expires_at, "edit ticket issued");
    Ok(manager.edit_endpoint(&ticket.ticket)?)
}

// ---------------------------------------------------------------------------
// Shares
// ---------------------------------------------------------------------------

async fn load_managed_context(
    conn: &mut PgConnection,
    user_id: i64,
    document_id: i64,
) -> AppResult<DocumentContext> {
    let ctx = load_context(conn, document_id, Some(user_id)).await?;
    require_manager(&ctx, user_id)?;
    Ok(ctx)
}

pub async fn list_shares(
    state: &AppState,
    user_id: i64,
    document_id: i64,
) -> AppResult<Vec<DocsShare>> {
    let mut conn = state.pool.acquire().await?;
    load_managed_context(&mut conn, user_id, document_id).await?;
    Ok(queries::list_shares(&mut conn, document_id).await?)
}

pub async fn create_share(
    state: &AppState,
    user_id: i64,
    document_id: i64,
    target_user: i64,
    roles: ShareRole,
) -> AppResult<DocsShare> {
    let mut tx = state.pool.begin().await?;
    let ctx = load_managed_context(&mut tx, user_id, document_id).await?;
    if target_user == ctx.owner_id() {
        return Err(AppError::Validation(
            "The team owner already has full access".into(),
        ));
    }
    if !queries::user_exists(&mut tx, target_user).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    let share =
        queries::create_share(&mut tx, state.issuer.ids(), document_id, target_user, roles).await?;
    tx.commit().await?;
    info!(document_id, share_id = share.id, target_user, ?roles, "document shared");
    Ok(share)
}

pub async fn update_share(
    state: &AppState,
    user_id: i64,
    document_id: i64,
    share_id: i64,
    roles: ShareRole,
) -> AppResult<DocsShare> {
    let mut tx = state.pool.begin().await?;
    load_managed_context(&mut tx, user_id, document_id).await?;
    let share = queries::update_share(&mut tx, document_id, share_id, roles).await?;
    tx.commit().await?;
    Ok(share)
}

pub async fn delete_share(
    state: &AppState,
    user_id: i64,
    document_id: i64,
    share_id: i64,
) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;
    load_managed_context(&mut tx, user_id, document_id).await?;
    queries::delete_share(&mut tx, document_id, share_id).await?;
    tx.commit().await?;
    Ok(())
}
