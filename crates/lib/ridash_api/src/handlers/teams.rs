//! Team handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use ridash_core::models::docs::Team;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::TeamRequest;
use crate::services::teams;

/// `POST /teams`: create a team owned by the caller.
pub async fn create_team_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<TeamRequest>,
) -> AppResult<(StatusCode, Json<Team>)> {
    let team = teams::create_team(&state, user.user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// `GET /teams`: teams the caller belongs to.
pub async fn list_teams_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<Team>>> {
    Ok(Json(teams::list_teams(&state, user.user_id).await?))
}

/// `GET /teams/{id}`
pub async fn get_team_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(team_id): Path<i64>,
) -> AppResult<Json<Team>> {
    Ok(Json(teams::get_team(&state, user.user_id, team_id).await?))
}

/// `PUT /teams/{id}`: rename. Owner only.
pub async fn update_team_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(team_id): Path<i64>,
    Json(body): Json<TeamRequest>,
) -> AppResult<Json<Team>> {
    let team = teams::update_team(&state, user.user_id, team_id, &body.name).await?;
    Ok(Json(team))
}

/// `DELETE /teams/{id}`: owner only.
pub async fn delete_team_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(team_id): Path<i64>,
) -> AppResult<StatusCode> {
    teams::delete_team(&state, user.user_id, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
