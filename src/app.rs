use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{ApprovalConfig, PermissionPolicy};
use crate::db::{CategoryStore, TeamStore, TimesheetStore, UserDirectory};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{categories, health, teams, timesheets};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: PermissionPolicy,
    pub teams: TeamStore,
    pub categories: CategoryStore,
    pub timesheets: TimesheetStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, approval: ApprovalConfig) -> Self {
        let teams = TeamStore::new(pool.clone());
        let users = UserDirectory::new(pool.clone());
        let policy = PermissionPolicy::new(Arc::new(teams.clone()), Arc::new(users), approval);

        Self {
            categories: CategoryStore::new(pool.clone()),
            timesheets: TimesheetStore::new(pool.clone()),
            pool,
            jwt: Arc::new(jwt),
            policy,
            teams,
        }
    }
}

/// Builds the router from environment configuration.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let approval = ApprovalConfig::from_env();
    tracing::info!(
        approved_users = approval.approved_users().count(),
        approved_groups = approval.approved_groups().count(),
        "approval configuration loaded"
    );
    Ok(router(AppState::new(pool, jwt_config, approval)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let team_routes = Router::new()
        .route("/", get(teams::list_teams))
        .route("/", post(teams::create_team))
        .route("/:id", get(teams::get_team))
        .route("/:id/roster", get(teams::get_roster))
        .route("/name/:name", delete(teams::delete_team));

    let category_routes = Router::new()
        .route("/", get(categories::list_categories))
        .route("/", post(categories::create_category))
        .route("/:id", get(categories::get_category))
        .route("/name/:name", delete(categories::delete_category));

    let timesheet_routes = Router::new()
        .route("/", post(timesheets::create_timesheet))
        .route("/:id", get(timesheets::get_timesheet))
        .route("/:id/entries", post(timesheets::create_entry))
        .route("/:id/entries/:entry_id", put(timesheets::update_entry))
        .route("/:id/entries/:entry_id", delete(timesheets::delete_entry));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/teams", team_routes)
        .nest("/categories", category_routes)
        .nest("/timesheets", timesheet_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
