pub mod dto;
pub mod extract;
pub mod groups;
pub mod middleware;
pub mod plans;
pub mod rest;
pub mod sessions;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_user;
use rest::ApiDoc;
use state::AppState;

/// Builds the full application router: the protected REST API, the health
/// probe and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/plans",
            get(plans::list_plans_handler).post(plans::create_plan_handler),
        )
        .route(
            "/plans/{id}",
            get(plans::get_plan_handler)
                .patch(plans::update_plan_handler)
                .delete(plans::delete_plan_handler),
        )
        .route("/plans/{id}/duplicate", post(plans::duplicate_plan_handler))
        .route("/plans/{id}/start", post(plans::start_plan_handler))
        .route(
            "/groups",
            get(groups::list_groups_handler).post(groups::create_group_handler),
        )
        .route(
            "/groups/{id}",
            get(groups::get_group_handler)
                .patch(groups::update_group_handler)
                .delete(groups::delete_group_handler),
        )
        .route(
            "/sessions",
            get(sessions::list_sessions_handler).post(sessions::create_session_handler),
        )
        .route(
            "/sessions/{id}",
            get(sessions::get_session_handler)
                .patch(sessions::update_session_handler)
                .delete(sessions::delete_session_handler),
        )
        .route("/sessions/{id}/records", post(sessions::add_record_handler))
        .route(
            "/sessions/{id}/records/{record_id}/sets/{set_id}",
            patch(sessions::update_set_handler),
        )
        .route_layer(axum_middleware::from_fn(require_user));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(rest::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
