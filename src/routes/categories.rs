use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::CurrentUser;
use crate::models::category::{Category, CategoryCreateRequest};
use crate::routes::teams::require_admin;

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses((status = 200, description = "List categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.all().await?))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "Categories",
    request_body = CategoryCreateRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category name already in use")
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CategoryCreateRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    require_admin(&state, &user).await?;
    let category = state.categories.add(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    responses((status = 200, description = "Category detail", body = Category))
)]
pub async fn get_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Category>> {
    state
        .categories
        .category_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("category not found"))
}

#[utoipa::path(
    delete,
    path = "/categories/name/{name}",
    tag = "Categories",
    params(("name" = String, Path, description = "Category name")),
    responses(
        (status = 204, description = "Category removed"),
        (status = 404, description = "No category with this name")
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    require_admin(&state, &user).await?;
    state.categories.remove_category(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
