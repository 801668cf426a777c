use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

/// `ok` when the database answers, `degraded` otherwise.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
}

impl HealthResponse {
    fn from_check(result: Result<i64, sqlx::Error>) -> Self {
        match result {
            Ok(_) => Self { status: "ok", db_ok: true, db_error: None },
            Err(err) => {
                tracing::warn!(error = %err, "health check: database unreachable");
                Self { status: "degraded", db_ok: false, db_error: Some(err.to_string()) }
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Service and database status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let result = query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await;
    Ok(Json(HealthResponse::from_check(result)))
}
