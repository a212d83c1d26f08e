//! services/api/src/web/sessions.rs
//!
//! REST handlers for exercise sessions, their records and set rows.

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use training_core::ports::SessionQuery;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorResponse};
use crate::web::dto::{
    CreateRecordRequest, CreateSessionRequest, ExerciseSessionResponse, PageResponse,
    SessionListQuery, UpdateSessionRequest, UpdateSetRecordRequest,
};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::state::AppState;

/// List the caller's sessions ordered by session date.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    params(SessionListQuery, ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    responses(
        (status = 200, description = "One page of sessions", body = PageResponse<ExerciseSessionResponse>),
        (status = 400, description = "Invalid paging or filter parameters", body = ErrorResponse)
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiQuery(params): ApiQuery<SessionListQuery>,
) -> ApiResult<Json<PageResponse<ExerciseSessionResponse>>> {
    let query = SessionQuery {
        status: params.status.map(Into::into),
        plan_id: params.plan_id,
        order: params.order.map(Into::into).unwrap_or_default(),
        page: state.page_request(params.page, params.limit)?,
    };
    let page = state.sessions.list_sessions(user_id, &query).await?;
    Ok(Json(PageResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "The session with records and sets", body = ExerciseSessionResponse),
        (status = 404, description = "No such session for this user", body = ErrorResponse)
    )
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> ApiResult<Json<ExerciseSessionResponse>> {
    let session = state.sessions.get_session(user_id, session_id).await?;
    Ok(Json(session.into()))
}

/// Create an empty session that is not tied to any plan.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user.")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = ExerciseSessionResponse),
        (status = 400, description = "Invalid session", body = ErrorResponse)
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiJson(body): ApiJson<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<ExerciseSessionResponse>)> {
    let session = state.sessions.create_session(user_id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

#[utoipa::path(
    patch,
    path = "/sessions/{id}",
    tag = "sessions",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Session id")
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = ExerciseSessionResponse),
        (status = 400, description = "Invalid session", body = ErrorResponse),
        (status = 404, description = "No such session for this user", body = ErrorResponse)
    )
)]
pub async fn update_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateSessionRequest>,
) -> ApiResult<Json<ExerciseSessionResponse>> {
    let session = state
        .sessions
        .update_session(user_id, session_id, body.into())
        .await?;
    Ok(Json(session.into()))
}

/// Delete a session together with its records and sets.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Session id")
    ),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "No such session for this user", body = ErrorResponse)
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.delete_session(user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append an exercise record with its sets. Returns the whole session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/records",
    tag = "sessions",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Session id")
    ),
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record added", body = ExerciseSessionResponse),
        (status = 400, description = "Invalid record or set numbering", body = ErrorResponse),
        (status = 404, description = "No such session for this user", body = ErrorResponse),
        (status = 409, description = "Position already taken", body = ErrorResponse)
    )
)]
pub async fn add_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath(session_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<ExerciseSessionResponse>)> {
    state.sessions.add_record(user_id, session_id, body.into()).await?;
    let session = state.sessions.get_session(user_id, session_id).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Edit one set row in place. Returns the whole session.
#[utoipa::path(
    patch,
    path = "/sessions/{id}/records/{record_id}/sets/{set_id}",
    tag = "sessions",
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user."),
        ("id" = Uuid, Path, description = "Session id"),
        ("record_id" = Uuid, Path, description = "Exercise record id"),
        ("set_id" = Uuid, Path, description = "Set record id")
    ),
    request_body = UpdateSetRecordRequest,
    responses(
        (status = 200, description = "Set updated", body = ExerciseSessionResponse),
        (status = 400, description = "Invalid set values", body = ErrorResponse),
        (status = 404, description = "No such session, record or set for this user", body = ErrorResponse)
    )
)]
pub async fn update_set_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    ApiPath((session_id, record_id, set_id)): ApiPath<(Uuid, Uuid, Uuid)>,
    ApiJson(body): ApiJson<UpdateSetRecordRequest>,
) -> ApiResult<Json<ExerciseSessionResponse>> {
    state
        .sessions
        .update_set(user_id, session_id, record_id, set_id, body.into())
        .await?;
    let session = state.sessions.get_session(user_id, session_id).await?;
    Ok(Json(session.into()))
}
