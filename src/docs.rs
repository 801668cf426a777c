use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::teams::list_teams,
        routes::teams::create_team,
        routes::teams::get_team,
        routes::teams::get_roster,
        routes::teams::delete_team,
        routes::categories::list_categories,
        routes::categories::create_category,
        routes::categories::get_category,
        routes::categories::delete_category,
        routes::timesheets::create_timesheet,
        routes::timesheets::get_timesheet,
        routes::timesheets::create_entry,
        routes::timesheets::update_entry,
        routes::timesheets::delete_entry
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            models::user::UserProfile,
            models::team::Team,
            models::team::TeamRole,
            models::team::TeamRoster,
            models::team::TeamCreateRequest,
            models::category::Category,
            models::category::CategoryCreateRequest,
            models::timesheet::Timesheet,
            models::timesheet::TimesheetEntry,
            models::timesheet::TimesheetDetail,
            models::timesheet::EntryRequest
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Teams", description = "Teams and their coordinators"),
        (name = "Categories", description = "Entry categories"),
        (name = "Timesheets", description = "Timesheets and entries")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;
    ensure_global_security(&mut doc);
    ensure_servers(&mut doc, port);
    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .with_credentials(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc)?);

    let json_route = {
        let doc_json = Arc::clone(&doc_json);
        get(move || {
            let doc_json = Arc::clone(&doc_json);
            async move { Json((*doc_json).clone()) }
        })
    };

    Ok(Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_global_security(doc: &mut Value) {
    if let Some(root) = doc.as_object_mut() {
        root.entry("security").or_insert_with(|| json!([{ "bearerAuth": [] }]));
    }
}

fn ensure_servers(doc: &mut Value, port: u16) {
    if let Some(root) = doc.as_object_mut() {
        root.insert(
            "servers".to_string(),
            json!([{ "url": format!("http://localhost:{port}"), "description": "Local server" }]),
        );
    }
}
