//! services/api/src/web/plans.rs
//!
//! REST handlers for training plans, including duplication and starting a
//! plan as a new exercise session.

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use training_core::ports::PlanQuery;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorResponse};
use crate::web::dto::{
    CreatePlanRequest, ExerciseSessionResponse, PageResponse, PlanListQuery, TrainingPlanResponse,
    UpdatePlanRequest,
};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::state::AppState;

/// List the caller's active plans, newest first.
#[utoipa::path(
    get,
    path = "/plans",
    tag = "plans",
    params(PlanListQuery, ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    responses(
        (status = 200, description = "One page of plans with their groups", body = PageResponse<TrainingPlanResponse>),
        (status = 400, description = "Invalid paging or filter parameters", body = ErrorResponse)
    )
)]
pub async fn list_plans_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiQuery(params): ApiQuery<PlanListQuery>,
) -> ApiResult<Json<PageResponse<TrainingPlanResponse>>> {
    let query = PlanQuery {
        search: params.search,
        status: params.status.map(Into::into),
        page: state.page_request(params.page, params.limit)?,
    };
    let page = state.plans.list_plans(user_id, &query).await?;
    Ok(Json(PageResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training plan id")
    ),
    responses(
        (status = 200, description = "The plan with its groups in order", body = TrainingPlanResponse),
        (status = 404, description = "No such active plan for this user", body = ErrorResponse)
    )
)]
pub async fn get_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<Json<TrainingPlanResponse>> {
    let plan = state.plans.get_plan(user_id, plan_id).await?;
    Ok(Json(plan.into()))
}

#[utoipa::path(
    post,
    path = "/plans",
    tag = "plans",
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Plan created", body = TrainingPlanResponse),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 404, description = "A referenced group does not exist", body = ErrorResponse)
    )
)]
pub async fn create_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(body): ApiJson<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<TrainingPlanResponse>)> {
    let plan = state.plans.create_plan(user_id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Update a plan. When `groupIds` is present the association list is replaced wholesale.
#[utoipa::path(
    patch,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training plan id")
    ),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Plan updated", body = TrainingPlanResponse),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 404, description = "No such plan, or a referenced group does not exist", body = ErrorResponse)
    )
)]
pub async fn update_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(plan_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdatePlanRequest>,
) -> ApiResult<Json<TrainingPlanResponse>> {
    let (patch, group_ids) = body.into_parts();
    let plan = state.plans.update_plan(user_id, plan_id, patch, group_ids).await?;
    Ok(Json(plan.into()))
}

/// Soft-delete a plan. Plans that sessions were started from cannot be deleted.
#[utoipa::path(
    delete,
    path = "/plans/{id}",
    tag = "plans",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training plan id")
    ),
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "No such active plan for this user", body = ErrorResponse),
        (status = 409, description = "Plan has associated sessions", body = ErrorResponse)
    )
)]
pub async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.plans.delete_plan(user_id, plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Copy a plan into a new draft with the same groups in the same order.
#[utoipa::path(
    post,
    path = "/plans/{id}/duplicate",
    tag = "plans",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training plan id")
    ),
    responses(
        (status = 201, description = "Copy created", body = TrainingPlanResponse),
        (status = 404, description = "No such active plan for this user", body = ErrorResponse)
    )
)]
pub async fn duplicate_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<(StatusCode, Json<TrainingPlanResponse>)> {
    let plan = state.plans.duplicate_plan(user_id, plan_id).await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Start a workout from a plan.
///
/// Every call creates a new session, so clients must not retry this blindly.
#[utoipa::path(
    post,
    path = "/plans/{id}/start",
    tag = "plans",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training plan id")
    ),
    responses(
        (status = 201, description = "Session created with one record per plan group", body = ExerciseSessionResponse),
        (status = 404, description = "No such active plan for this user", body = ErrorResponse)
    )
)]
pub async fn start_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(plan_id): ApiPath<Uuid>,
) -> ApiResult<(StatusCode, Json<ExerciseSessionResponse>)> {
    let session = state.instantiation.start_plan(user_id, plan_id).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}
