//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the unauthenticated
//! health endpoint.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ErrorResponse;
use crate::web::{dto, groups, plans, sessions};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        plans::list_plans_handler,
        plans::get_plan_handler,
        plans::create_plan_handler,
        plans::update_plan_handler,
        plans::delete_plan_handler,
        plans::duplicate_plan_handler,
        plans::start_plan_handler,
        groups::list_groups_handler,
        groups::get_group_handler,
        groups::create_group_handler,
        groups::update_group_handler,
        groups::delete_group_handler,
        sessions::list_sessions_handler,
        sessions::get_session_handler,
        sessions::create_session_handler,
        sessions::update_session_handler,
        sessions::delete_session_handler,
        sessions::add_record_handler,
        sessions::update_set_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            dto::PlanStatusDto,
            dto::SessionStatusDto,
            dto::SortOrderParam,
            dto::GroupSortBy,
        )
    ),
    tags(
        (name = "plans", description = "Training plans and starting them as sessions."),
        (name = "groups", description = "Reusable training group templates."),
        (name = "sessions", description = "Concrete workouts with their records and sets."),
        (name = "health", description = "Liveness probe.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health Check
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
