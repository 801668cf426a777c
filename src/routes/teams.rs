use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::CurrentUser;
use crate::models::team::{Team, TeamCreateRequest, TeamRoster};
use crate::models::user::UserProfile;

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Teams",
    responses((status = 200, description = "List teams", body = [Team]))
)]
pub async fn list_teams(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Team>>> {
    Ok(Json(state.teams.all().await?))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "Teams",
    request_body = TeamCreateRequest,
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 403, description = "Caller is not an administrator"),
        (status = 409, description = "Team name already in use")
    )
)]
pub async fn create_team(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<TeamCreateRequest>,
) -> AppResult<(StatusCode, Json<Team>)> {
    require_admin(&state, &user).await?;
    let team = state.teams.add(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    responses((status = 200, description = "Team detail", body = Team))
)]
pub async fn get_team(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Team>> {
    let team = fetch_team(&state, id).await?;
    Ok(Json(team))
}

#[utoipa::path(
    get,
    path = "/teams/{id}/roster",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    responses((status = 200, description = "Members and coordinators", body = TeamRoster))
)]
pub async fn get_roster(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<TeamRoster>> {
    let team = fetch_team(&state, id).await?;
    Ok(Json(state.teams.roster(&team).await?))
}

#[utoipa::path(
    delete,
    path = "/teams/name/{name}",
    tag = "Teams",
    params(("name" = String, Path, description = "Team name")),
    responses(
        (status = 204, description = "Team removed"),
        (status = 404, description = "No team with this name")
    )
)]
pub async fn delete_team(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    require_admin(&state, &user).await?;
    if state.teams.remove_team(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("No Team with this Name"))
    }
}

async fn fetch_team(state: &AppState, id: i64) -> AppResult<Team> {
    state
        .teams
        .team_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("team not found"))
}

pub(crate) async fn require_admin(state: &AppState, user: &UserProfile) -> AppResult<()> {
    if state.policy.is_admin(user).await? {
        Ok(())
    } else {
        Err(AppError::forbidden("administrator required"))
    }
}
