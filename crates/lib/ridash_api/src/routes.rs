//! Route path constants.

pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_OAUTH_PROVIDER: &str = "/auth/oauth/{provider}";
pub const GET_AUTH_OAUTH_PROVIDER_CALLBACK: &str = "/auth/oauth/{provider}/callback";

pub const TEAMS: &str = "/teams";
pub const TEAMS_ID: &str = "/teams/{id}";
pub const TEAMS_ID_FOLDERS: &str = "/teams/{team_id}/folders";
pub const TEAMS_ID_FOLDERS_ID: &str = "/teams/{team_id}/folders/{id}";

pub const DOCUMENTS: &str = "/documents";
pub const DOCUMENTS_ID: &str = "/documents/{id}";
pub const DOCUMENTS_ID_SOCKET: &str = "/documents/{id}/socket";
pub const DOCUMENTS_ID_SHARES: &str = "/documents/{id}/shares";
pub const DOCUMENTS_ID_SHARES_ID: &str = "/documents/{id}/shares/{share_id}";
