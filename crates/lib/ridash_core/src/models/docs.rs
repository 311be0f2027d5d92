//! Team, folder, document and share models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    #[serde(with = "super::id_string")]
    pub id: i64,
    #[serde(with = "super::id_string")]
    pub owner_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role of a user inside a team. Only `Owner` carries access semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Folder {
    #[serde(with = "super::id_string")]
    pub id: i64,
    #[serde(with = "super::id_string")]
    pub team_id: i64,
    pub name: String,
    #[serde(with = "super::option_id_string")]
    pub parent_folder: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Anonymous access level of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "docs_permission", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocsPermission {
    #[default]
    Private,
    Public,
    PublicWrite,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    #[serde(with = "super::id_string")]
    pub id: i64,
    #[serde(with = "super::id_string")]
    pub folder_id: i64,
    pub name: String,
    pub permission: DocsPermission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role granted by a share. `Write` implies `Read`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "docs_share_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShareRole {
    Read,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocsShare {
    #[serde(with = "super::id_string")]
    pub id: i64,
    #[serde(with = "super::id_string")]
    pub document_id: i64,
    #[serde(with = "super::id_string")]
    pub user_id: i64,
    pub roles: ShareRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_role_outranks_read() {
        assert!(ShareRole::Write > ShareRole::Read);
    }

    #[test]
    fn permission_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(DocsPermission::PublicWrite).unwrap(),
            "public_write"
        );
        let parsed: DocsPermission = serde_json::from_str(r#""public""#).unwrap();
        assert_eq!(parsed, DocsPermission::Public);
    }
}
