//! Request and response bodies.

use ridash_core::models::docs::{DocsPermission, Document, ShareRole};
use ridash_core::models::{id_string, option_id_string};
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct OAuthEntryQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Teams and folders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    pub name: String,
    #[serde(default, with = "option_id_string")]
    pub parent_folder: Option<i64>,
}

// ---------------------------------------------------------------------------
// Documents and shares
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    #[serde(default)]
    pub permission: DocsPermission,
    #[serde(with = "id_string")]
    pub folder_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    pub permission: Option<DocsPermission>,
}

/// Document metadata plus content from the document manager, when available.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    #[serde(with = "id_string")]
    pub user_id: i64,
    pub roles: ShareRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShareRequest {
    pub roles: ShareRole,
}
