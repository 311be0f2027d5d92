//! Team, folder, document and share queries.
//!
//! All functions take a connection so the caller's transaction covers them.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::DocsError;
use super::permission::DocumentContext;
use crate::id::IdGenerator;
use crate::models::docs::{
    DocsPermission, DocsShare, Document, Folder, ShareRole, Team, TeamRole,
};

const TEAM_COLUMNS: &str = "id, owner_id, name, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, team_id, name, parent_folder, created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, folder_id, name, permission, created_at, updated_at";
const SHARE_COLUMNS: &str = "id, document_id, user_id, roles";

fn conflict_on_unique(e: sqlx::Error, message: &str) -> DocsError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DocsError::Conflict(message.to_string())
        }
        _ => DocsError::DbError(e),
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Create a team and enrol the creator as its `owner` member.
pub async fn create_team(
    conn: &mut PgConnection,
    ids: &dyn IdGenerator,
    owner_id: i64,
    name: &str,
) -> Result<Team, DocsError> {
    let team = sqlx::query_as::<_, Team>(&format!(
        "INSERT INTO teams (id, owner_id, name) VALUES ($1, $2, $3) RETURNING {TEAM_COLUMNS}"
    ))
    .bind(ids.next_id()?)
    .bind(owner_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("INSERT INTO team_members (id, team_id, user_id, role) VALUES ($1, $2, $3, $4)")
        .bind(ids.next_id()?)
        .bind(team.id)
        .bind(owner_id)
        .bind(TeamRole::Owner)
        .execute(&mut *conn)
        .await?;

    Ok(team)
}

/// Teams the user owns or belongs to.
pub async fn list_teams_for_user(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<Vec<Team>, DocsError> {
    let teams = sqlx::query_as::<_, Team>(
        "SELECT t.id, t.owner_id, t.name, t.created_at, t.updated_at FROM teams t \
         WHERE t.owner_id = $1 \
            OR EXISTS (SELECT 1 FROM team_members m WHERE m.team_id = t.id AND m.user_id = $1) \
         ORDER BY t.created_at",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(teams)
}

pub async fn get_team(conn: &mut PgConnection, team_id: i64) -> Result<Option<Team>, DocsError> {
    let team = sqlx::query_as::<_, Team>(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
    ))
    .bind(team_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(team)
}

pub async fn update_team(
    conn: &mut PgConnection,
    team_id: i64,
    name: &str,
) -> Result<Team, DocsError> {
    sqlx::query_as::<_, Team>(&format!(
        "UPDATE teams SET name = $2, updated_at = now() WHERE id = $1 RETURNING {TEAM_COLUMNS}"
    ))
    .bind(team_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DocsError::NotFound("team"))
}

/// Delete a team. Members, folders, documents and shares cascade.
pub async fn delete_team(conn: &mut PgConnection, team_id: i64) -> Result<(), DocsError> {
    let result = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DocsError::NotFound("team"));
    }
    Ok(())
}

/// Whether the user is enrolled in the team under any role.
pub async fn is_team_member(
    conn: &mut PgConnection,
    team_id: i64,
    user_id: i64,
) -> Result<bool, DocsError> {
    let member = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(member)
}

/// IDs of every document inside a team, for content cleanup.
pub async fn list_team_document_ids(
    conn: &mut PgConnection,
    team_id: i64,
) -> Result<Vec<i64>, DocsError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT d.id FROM documents d JOIN folders f ON f.id = d.folder_id WHERE f.team_id = $1",
    )
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

pub async fn create_folder(
    conn: &mut PgConnection,
    ids: &dyn IdGenerator,
    team_id: i64,
    name: &str,
    parent_folder: Option<i64>,
) -> Result<Folder, DocsError> {
    let folder = sqlx::query_as::<_, Folder>(&format!(
        "INSERT INTO folders (id, team_id, name, parent_folder) VALUES ($1, $2, $3, $4) \
         RETURNING {FOLDER_COLUMNS}"
    ))
    .bind(ids.next_id()?)
    .bind(team_id)
    .bind(name)
    .bind(parent_folder)
    .fetch_one(&mut *conn)
    .await?;
    Ok(folder)
}

pub async fn list_folders(conn: &mut PgConnection, team_id: i64) -> Result<Vec<Folder>, DocsError> {
    let folders = sqlx::query_as::<_, Folder>(&format!(
        "SELECT {FOLDER_COLUMNS} FROM folders WHERE team_id = $1 ORDER BY created_at"
    ))
    .bind(team_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(folders)
}

pub async fn get_folder(
    conn: &mut PgConnection,
    folder_id: i64,
) -> Result<Option<Folder>, DocsError> {
    let folder = sqlx::query_as::<_, Folder>(&format!(
        "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1"
    ))
    .bind(folder_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(folder)
}

pub async fn update_folder(
    conn: &mut PgConnection,
    folder_id: i64,
    name: &str,
    parent_folder: Option<i64>,
) -> Result<Folder, DocsError> {
    sqlx::query_as::<_, Folder>(&format!(
        "UPDATE folders SET name = $2, parent_folder = $3, updated_at = now() \
         WHERE id = $1 RETURNING {FOLDER_COLUMNS}"
    ))
    .bind(folder_id)
    .bind(name)
    .bind(parent_folder)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DocsError::NotFound("folder"))
}

/// Delete a folder. Sub-folders and their documents cascade.
pub async fn delete_folder(conn: &mut PgConnection, folder_id: i64) -> Result<(), DocsError> {
    let result = sqlx::query("DELETE FROM folders WHERE id = $1")
        .bind(folder_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DocsError::NotFound("folder"));
    }
    Ok(())
}

/// IDs of every document under `folder_id`, sub-folders included.
pub async fn list_folder_document_ids(
    conn: &mut PgConnection,
    folder_id: i64,
) -> Result<Vec<i64>, DocsError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "WITH RECURSIVE subtree(id) AS ( \
             SELECT id FROM folders WHERE id = $1 \
             UNION \
             SELECT f.id FROM folders f JOIN subtree s ON f.parent_folder = s.id \
         ) \
         SELECT d.id FROM documents d JOIN subtree s ON d.folder_id = s.id",
    )
    .bind(folder_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids)
}

/// True when `ancestor` appears on the parent chain above `folder_id`.
pub async fn is_descendant_of(
    conn: &mut PgConnection,
    folder_id: i64,
    ancestor: i64,
) -> Result<bool, DocsError> {
    let found = sqlx::query_scalar::<_, bool>(
        "WITH RECURSIVE chain(id, parent_folder) AS ( \
             SELECT id, parent_folder FROM folders WHERE id = $1 \
             UNION \
             SELECT f.id, f.parent_folder FROM folders f JOIN chain c ON f.id = c.parent_folder \
         ) \
         SELECT EXISTS(SELECT 1 FROM chain WHERE parent_folder = $2)",
    )
    .bind(folder_id)
    .bind(ancestor)
    .fetch_one(&mut *conn)
    .await?;
    Ok(found)
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub async fn create_document(
    conn: &mut PgConnection,
    ids: &dyn IdGenerator,
    folder_id: i64,
    name: &str,
    permission: DocsPermission,
) -> Result<Document, DocsError> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "INSERT INTO documents (id, folder_id, name, permission) VALUES ($1, $2, $3, $4) \
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(ids.next_id()?)
    .bind(folder_id)
    .bind(name)
    .bind(permission)
    .fetch_one(&mut *conn)
    .await?;
    Ok(document)
}

pub async fn update_document(
    conn: &mut PgConnection,
    document_id: i64,
    name: &str,
    permission: DocsPermission,
) -> Result<Document, DocsError> {
    sqlx::query_as::<_, Document>(&format!(
        "UPDATE documents SET name = $2, permission = $3, updated_at = now() \
         WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(document_id)
    .bind(name)
    .bind(permission)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DocsError::NotFound("document"))
}

/// Delete a document. Its shares cascade.
pub async fn delete_document(conn: &mut PgConnection, document_id: i64) -> Result<(), DocsError> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DocsError::NotFound("document"));
    }
    Ok(())
}

/// Documents readable by `requester`: public ones, ones in teams the
/// requester owns and ones shared with the requester.
pub async fn list_documents_for_user(
    conn: &mut PgConnection,
    requester: Option<i64>,
) -> Result<Vec<Document>, DocsError> {
    let documents = sqlx::query_as::<_, Document>(
        "SELECT d.id, d.folder_id, d.name, d.permission, d.created_at, d.updated_at \
         FROM documents d \
         JOIN folders f ON f.id = d.folder_id \
         JOIN teams t ON t.id = f.team_id \
         WHERE d.permission <> 'private' \
            OR t.owner_id = $1 \
            OR EXISTS (SELECT 1 FROM docs_shares s WHERE s.document_id = d.id AND s.user_id = $1) \
         ORDER BY d.created_at DESC",
    )
    .bind(requester)
    .fetch_all(&mut *conn)
    .await?;
    Ok(documents)
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    d_id: i64,
    d_folder_id: i64,
    d_name: String,
    d_permission: DocsPermission,
    d_created_at: DateTime<Utc>,
    d_updated_at: DateTime<Utc>,
    f_team_id: i64,
    f_name: String,
    f_parent_folder: Option<i64>,
    f_created_at: DateTime<Utc>,
    f_updated_at: DateTime<Utc>,
    t_owner_id: i64,
    t_name: String,
    t_created_at: DateTime<Utc>,
    t_updated_at: DateTime<Utc>,
    s_id: Option<i64>,
    s_roles: Option<ShareRole>,
}

impl ContextRow {
    fn into_context(self, requester: Option<i64>) -> DocumentContext {
        let share = match (self.s_id, self.s_roles, requester) {
            (Some(id), Some(roles), Some(user_id)) => Some(DocsShare {
                id,
                document_id: self.d_id,
                user_id,
                roles,
            }),
            _ => None,
        };
        DocumentContext {
            document: Document {
                id: self.d_id,
                folder_id: self.d_folder_id,
                name: self.d_name,
                permission: self.d_permission,
                created_at: self.d_created_at,
                updated_at: self.d_updated_at,
            },
            folder: Folder {
                id: self.d_folder_id,
                team_id: self.f_team_id,
                name: self.f_name,
                parent_folder: self.f_parent_folder,
                created_at: self.f_created_at,
                updated_at: self.f_updated_at,
            },
            team: Team {
                id: self.f_team_id,
                owner_id: self.t_owner_id,
                name: self.t_name,
                created_at: self.t_created_at,
                updated_at: self.t_updated_at,
            },
            share,
        }
    }
}

/// Load a document with its folder, team and the requester's share in one
/// round-trip.
pub async fn load_document_context(
    conn: &mut PgConnection,
    document_id: i64,
    requester: Option<i64>,
) -> Result<Option<DocumentContext>, DocsError> {
    let row = sqlx::query_as::<_, ContextRow>(
        "SELECT d.id AS d_id, d.folder_id AS d_folder_id, d.name AS d_name, \
                d.permission AS d_permission, d.created_at AS d_created_at, \
                d.updated_at AS d_updated_at, \
                f.team_id AS f_team_id, f.name AS f_name, f.parent_folder AS f_parent_folder, \
                f.created_at AS f_created_at, f.updated_at AS f_updated_at, \
                t.owner_id AS t_owner_id, t.name AS t_name, \
                t.created_at AS t_created_at, t.updated_at AS t_updated_at, \
                s.id AS s_id, s.roles AS s_roles \
         FROM documents d \
         JOIN folders f ON f.id = d.folder_id \
         JOIN teams t ON t.id = f.team_id \
         LEFT JOIN docs_shares s ON s.document_id = d.id AND s.user_id = $2 \
         WHERE d.id = $1",
    )
    .bind(document_id)
    .bind(requester)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|row| row.into_context(requester)))
}

// ---------------------------------------------------------------------------
// Shares
// ---------------------------------------------------------------------------

pub async fn list_shares(
    conn: &mut PgConnection,
    document_id: i64,
) -> Result<Vec<DocsShare>, DocsError> {
    let shares = sqlx::query_as::<_, DocsShare>(&format!(
        "SELECT {SHARE_COLUMNS} FROM docs_shares WHERE document_id = $1 ORDER BY id"
    ))
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(shares)
}

pub async fn create_share(
    conn: &mut PgConnection,
    ids: &dyn IdGenerator,
    document_id: i64,
    user_id: i64,
    roles: ShareRole,
) -> Result<DocsShare, DocsError> {
    sqlx::query_as::<_, DocsShare>(&format!(
        "INSERT INTO docs_shares (id, document_id, user_id, roles) VALUES ($1, $2, $3, $4) \
         RETURNING {SHARE_COLUMNS}"
    ))
    .bind(ids.next_id()?)
    .bind(document_id)
    .bind(user_id)
    .bind(roles)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, "document is already shared with this user"))
}

pub async fn update_share(
    conn: &mut PgConnection,
    document_id: i64,
    share_id: i64,
    roles: ShareRole,
) -> Result<DocsShare, DocsError> {
    sqlx::query_as::<_, DocsShare>(&format!(
        "UPDATE docs_shares SET roles = $3 WHERE id = $1 AND document_id = $2 \
         RETURNING {SHARE_COLUMNS}"
    ))
    .bind(share_id)
    .bind(document_id)
    .bind(roles)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DocsError::NotFound("share"))
}

pub async fn delete_share(
    conn: &mut PgConnection,
    document_id: i64,
    share_id: i64,
) -> Result<(), DocsError> {
    let result = sqlx::query("DELETE FROM docs_shares WHERE id = $1 AND document_id = $2")
        .bind(share_id)
        .bind(document_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DocsError::NotFound("share"));
    }
    Ok(())
}

/// Whether a user with this ID exists.
pub async fn user_exists(conn: &mut PgConnection, user_id: i64) -> Result<bool, DocsError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}
