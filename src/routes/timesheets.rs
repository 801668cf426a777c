//! Timesheet routes.
//!
//! Every handler resolves the caller and requires approval. Reads then apply
//! the view rule; entry writes apply the edit or delete rule.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::DenialReason;
use crate::errors::{AppError, AppResult};
use crate::jwt::CurrentUser;
use crate::models::timesheet::{EntryRequest, EntrySpan, Timesheet, TimesheetDetail, TimesheetEntry};
use crate::models::user::UserProfile;

#[utoipa::path(
    post,
    path = "/timesheets",
    tag = "Timesheets",
    responses(
        (status = 201, description = "Timesheet created for the caller", body = Timesheet),
        (status = 409, description = "Caller already has a timesheet")
    )
)]
pub async fn create_timesheet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<(StatusCode, Json<Timesheet>)> {
    state.policy.require_approved(&user).await?;
    let sheet = state.timesheets.create(&user.key).await?;
    Ok((StatusCode::CREATED, Json(sheet)))
}

#[utoipa::path(
    get,
    path = "/timesheets/{id}",
    tag = "Timesheets",
    params(("id" = Uuid, Path, description = "Timesheet id")),
    responses(
        (status = 200, description = "Timesheet with entries", body = TimesheetDetail),
        (status = 401, description = "Caller may not view this timesheet")
    )
)]
pub async fn get_timesheet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TimesheetDetail>> {
    let sheet = viewable_sheet(&state, &user, id).await?;
    Ok(Json(state.timesheets.detail(sheet).await?))
}

#[utoipa::path(
    post,
    path = "/timesheets/{id}/entries",
    tag = "Timesheets",
    params(("id" = Uuid, Path, description = "Timesheet id")),
    request_body = EntryRequest,
    responses(
        (status = 201, description = "Entry created", body = TimesheetEntry),
        (status = 400, description = "End before begin"),
        (status = 401, description = "Edit not permitted")
    )
)]
pub async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EntryRequest>,
) -> AppResult<(StatusCode, Json<TimesheetEntry>)> {
    payload.validate()?;
    let sheet = approved_sheet(&state, &user, id).await?;

    state
        .policy
        .user_can_edit_timesheet_entry(&user, &sheet, &payload.span())
        .await?;

    let entry = state.timesheets.insert_entry(&sheet, &payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/timesheets/{id}/entries/{entry_id}",
    tag = "Timesheets",
    params(
        ("id" = Uuid, Path, description = "Timesheet id"),
        ("entry_id" = Uuid, Path, description = "Entry id")
    ),
    request_body = EntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = TimesheetEntry),
        (status = 401, description = "Edit not permitted")
    )
)]
pub async fn update_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EntryRequest>,
) -> AppResult<Json<TimesheetEntry>> {
    payload.validate()?;
    let sheet = approved_sheet(&state, &user, id).await?;
    let entry = entry_of_sheet(&state, &sheet, entry_id).await?;

    // The submitted times are checked, under the stored provenance.
    let span = EntrySpan::new(payload.begin_date, payload.end_date, entry.is_imported);
    state.policy.user_can_edit_timesheet_entry(&user, &sheet, &span).await?;

    let entry = state.timesheets.update_entry(&entry, &payload).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/timesheets/{id}/entries/{entry_id}",
    tag = "Timesheets",
    params(
        ("id" = Uuid, Path, description = "Timesheet id"),
        ("entry_id" = Uuid, Path, description = "Entry id")
    ),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Delete not permitted")
    )
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let sheet = approved_sheet(&state, &user, id).await?;
    let entry = entry_of_sheet(&state, &sheet, entry_id).await?;

    state.policy.user_can_delete_timesheet_entry(&user, &entry).await?;

    state.timesheets.delete_entry(&entry).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Loads the sheet once the caller is approved. Entry mutations go
/// straight to the edit/delete rules from here.
async fn approved_sheet(state: &AppState, user: &UserProfile, id: Uuid) -> AppResult<Timesheet> {
    state.policy.require_approved(user).await?;

    state
        .timesheets
        .by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("timesheet not found"))
}

async fn viewable_sheet(state: &AppState, user: &UserProfile, id: Uuid) -> AppResult<Timesheet> {
    let sheet = approved_sheet(state, user, id).await?;

    if !state.policy.user_can_view_timesheet(Some(user), Some(&sheet)).await? {
        return Err(AppError::not_authorized(DenialReason::CannotViewTimesheet));
    }
    Ok(sheet)
}

async fn entry_of_sheet(state: &AppState, sheet: &Timesheet, entry_id: Uuid) -> AppResult<TimesheetEntry> {
    state
        .timesheets
        .entry_by_id(entry_id)
        .await?
        .filter(|entry| entry.timesheet.id == sheet.id)
        .ok_or_else(|| AppError::not_found("timesheet entry not found"))
}
