//! services/api/src/web/groups.rs
//!
//! REST handlers for training groups.

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use training_core::ports::GroupQuery;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorResponse};
use crate::web::dto::{
    CreateGroupRequest, GroupListQuery, PageResponse, TrainingGroupResponse, UpdateGroupRequest,
};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::state::AppState;

/// List the caller's training groups.
#[utoipa::path(
    get,
    path = "/groups",
    tag = "groups",
    params(GroupListQuery, ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    responses(
        (status = 200, description = "One page of groups", body = PageResponse<TrainingGroupResponse>),
        (status = 400, description = "Invalid paging or sort parameters", body = ErrorResponse)
    )
)]
pub async fn list_groups_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiQuery(params): ApiQuery<GroupListQuery>,
) -> ApiResult<Json<PageResponse<TrainingGroupResponse>>> {
    let query = GroupQuery {
        sort_by: params.sort_by.map(Into::into).unwrap_or_default(),
        order: params.order.map(Into::into).unwrap_or_default(),
        page: state.page_request(params.page, params.limit)?,
    };
    let page = state.groups.list_groups(user_id, &query).await?;
    Ok(Json(PageResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "groups",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training group id")
    ),
    responses(
        (status = 200, description = "The group with its set templates", body = TrainingGroupResponse),
        (status = 404, description = "No such group for this user", body = ErrorResponse)
    )
)]
pub async fn get_group_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<Json<TrainingGroupResponse>> {
    let group = state.groups.get_group(user_id, group_id).await?;
    Ok(Json(group.into()))
}

/// Create a training group. The referenced exercise must exist.
#[utoipa::path(
    post,
    path = "/groups",
    tag = "groups",
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = TrainingGroupResponse),
        (status = 400, description = "Invalid group or unknown exercise", body = ErrorResponse)
    )
)]
pub async fn create_group_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<TrainingGroupResponse>)> {
    let group = state.groups.create_group(user_id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

#[utoipa::path(
    patch,
    path = "/groups/{id}",
    tag = "groups",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training group id")
    ),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = TrainingGroupResponse),
        (status = 400, description = "Invalid group", body = ErrorResponse),
        (status = 404, description = "No such group for this user", body = ErrorResponse)
    )
)]
pub async fn update_group_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateGroupRequest>,
) -> ApiResult<Json<TrainingGroupResponse>> {
    let group = state.groups.update_group(user_id, group_id, body.into()).await?;
    Ok(Json(group.into()))
}

/// Delete a training group. Fails while an active plan still uses it.
#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "groups",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Training group id")
    ),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "No such group for this user", body = ErrorResponse),
        (status = 409, description = "Group is used by an active plan", body = ErrorResponse)
    )
)]
pub async fn delete_group_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.groups.delete_group(user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
