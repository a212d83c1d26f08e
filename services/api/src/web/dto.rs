//! services/api/src/web/dto.rs
//!
//! Request and response payloads for the REST API. Everything on the wire is
//! camelCase; the core's domain types never leak into JSON directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use training_core::domain::{
    ExerciseRecord, ExerciseSession, PlanStatus, SessionStatus, SetRecord, SetTemplate,
    TrainingGroup,
};
use training_core::paging::{Page, SortOrder};
use training_core::ports::GroupSortField;
use training_core::services::{
    NewPlan, NewRecord, NewSession, NewSetRecord, NewTrainingGroup, PlanDetails, PlanEntry,
    PlanPatch, SessionPatch, SetRecordPatch, SetTemplateInput, TrainingGroupPatch,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Shared Types
//=========================================================================================

/// One page of a list endpoint.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn from_page<D>(page: Page<D>) -> Self
    where
        T: From<D>,
    {
        let page = page.map(T::from);
        Self {
            items: page.items,
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrderParam {
    Asc,
    Desc,
}

impl From<SortOrderParam> for SortOrder {
    fn from(value: SortOrderParam) -> Self {
        match value {
            SortOrderParam::Asc => SortOrder::Asc,
            SortOrderParam::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatusDto {
    Draft,
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl From<PlanStatusDto> for PlanStatus {
    fn from(value: PlanStatusDto) -> Self {
        match value {
            PlanStatusDto::Draft => PlanStatus::Draft,
            PlanStatusDto::Active => PlanStatus::Active,
            PlanStatusDto::Completed => PlanStatus::Completed,
            PlanStatusDto::Paused => PlanStatus::Paused,
            PlanStatusDto::Cancelled => PlanStatus::Cancelled,
        }
    }
}

impl From<PlanStatus> for PlanStatusDto {
    fn from(value: PlanStatus) -> Self {
        match value {
            PlanStatus::Draft => PlanStatusDto::Draft,
            PlanStatus::Active => PlanStatusDto::Active,
            PlanStatus::Completed => PlanStatusDto::Completed,
            PlanStatus::Paused => PlanStatusDto::Paused,
            PlanStatus::Cancelled => PlanStatusDto::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatusDto {
    InProgress,
    Completed,
    Paused,
    Cancelled,
}

impl From<SessionStatusDto> for SessionStatus {
    fn from(value: SessionStatusDto) -> Self {
        match value {
            SessionStatusDto::InProgress => SessionStatus::InProgress,
            SessionStatusDto::Completed => SessionStatus::Completed,
            SessionStatusDto::Paused => SessionStatus::Paused,
            SessionStatusDto::Cancelled => SessionStatus::Cancelled,
        }
    }
}

impl From<SessionStatus> for SessionStatusDto {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::InProgress => SessionStatusDto::InProgress,
            SessionStatus::Completed => SessionStatusDto::Completed,
            SessionStatus::Paused => SessionStatusDto::Paused,
            SessionStatus::Cancelled => SessionStatusDto::Cancelled,
        }
    }
}

//=========================================================================================
// Training Groups
//=========================================================================================

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum GroupSortBy {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl From<GroupSortBy> for GroupSortField {
    fn from(value: GroupSortBy) -> Self {
        match value {
            GroupSortBy::Name => GroupSortField::Name,
            GroupSortBy::CreatedAt => GroupSortField::CreatedAt,
            GroupSortBy::UpdatedAt => GroupSortField::UpdatedAt,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GroupListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[param(value_type = Option<String>, example = "createdAt")]
    pub sort_by: Option<GroupSortBy>,
    #[param(value_type = Option<String>, example = "desc")]
    pub order: Option<SortOrderParam>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetTemplateRequest {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
}

impl From<SetTemplateRequest> for SetTemplateInput {
    fn from(value: SetTemplateRequest) -> Self {
        SetTemplateInput {
            reps: value.reps,
            weight: value.weight,
            rest_time_seconds: value.rest_time_seconds,
            notes: value.notes,
        }
    }
}

/// Set templates are numbered 1..n in the order given.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub exercise_ref: Uuid,
    pub sets: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    /// Defaults to 60.
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub set_templates: Vec<SetTemplateRequest>,
}

impl From<CreateGroupRequest> for NewTrainingGroup {
    fn from(value: CreateGroupRequest) -> Self {
        NewTrainingGroup {
            name: value.name,
            exercise_id: value.exercise_ref,
            sets: value.sets,
            reps_min: value.reps_min,
            reps_max: value.reps_max,
            weight_min: value.weight_min,
            weight_max: value.weight_max,
            rest_time_seconds: value.rest_time_seconds,
            notes: value.notes,
            set_templates: value.set_templates.into_iter().map(Into::into).collect(),
        }
    }
}

/// Absent fields are left untouched. `setTemplates`, when present, replaces the whole list.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub exercise_ref: Option<Uuid>,
    pub sets: Option<u32>,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
    pub set_templates: Option<Vec<SetTemplateRequest>>,
}

impl From<UpdateGroupRequest> for TrainingGroupPatch {
    fn from(value: UpdateGroupRequest) -> Self {
        TrainingGroupPatch {
            name: value.name,
            exercise_id: value.exercise_ref,
            sets: value.sets,
            reps_min: value.reps_min,
            reps_max: value.reps_max,
            weight_min: value.weight_min,
            weight_max: value.weight_max,
            rest_time_seconds: value.rest_time_seconds,
            notes: value.notes,
            set_templates: value
                .set_templates
                .map(|templates| templates.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetTemplateResponse {
    pub id: Uuid,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
}

impl From<SetTemplate> for SetTemplateResponse {
    fn from(value: SetTemplate) -> Self {
        SetTemplateResponse {
            id: value.id,
            set_number: value.set_number,
            reps: value.reps,
            weight: value.weight,
            rest_time_seconds: value.rest_time_seconds,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingGroupResponse {
    pub id: Uuid,
    pub name: String,
    pub exercise_ref: Uuid,
    pub sets: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub rest_time_seconds: u32,
    pub notes: Option<String>,
    pub set_templates: Vec<SetTemplateResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TrainingGroup> for TrainingGroupResponse {
    fn from(value: TrainingGroup) -> Self {
        TrainingGroupResponse {
            id: value.id,
            name: value.name,
            exercise_ref: value.exercise_id,
            sets: value.sets,
            reps_min: value.reps_min,
            reps_max: value.reps_max,
            weight_min: value.weight_min,
            weight_max: value.weight_max,
            rest_time_seconds: value.rest_time_seconds,
            notes: value.notes,
            set_templates: value.set_templates.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

//=========================================================================================
// Training Plans
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PlanListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Case-insensitive match against name and description.
    pub search: Option<String>,
    #[param(value_type = Option<String>, example = "DRAFT")]
    pub status: Option<PlanStatusDto>,
}

/// Groups are associated in the order given.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `DRAFT`.
    pub status: Option<PlanStatusDto>,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: Option<bool>,
    pub is_public: Option<bool>,
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

impl From<CreatePlanRequest> for NewPlan {
    fn from(value: CreatePlanRequest) -> Self {
        NewPlan {
            name: value.name,
            description: value.description,
            status: value.status.map(Into::into),
            plan_date: value.plan_date,
            start_date: value.start_date,
            end_date: value.end_date,
            is_template: value.is_template,
            is_public: value.is_public,
            group_ids: value.group_ids,
        }
    }
}

/// Absent fields are left untouched. `groupIds`, when present (even empty),
/// replaces every association.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PlanStatusDto>,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: Option<bool>,
    pub is_public: Option<bool>,
    pub group_ids: Option<Vec<Uuid>>,
}

impl UpdatePlanRequest {
    pub fn into_parts(self) -> (PlanPatch, Option<Vec<Uuid>>) {
        let patch = PlanPatch {
            name: self.name,
            description: self.description,
            status: self.status.map(Into::into),
            plan_date: self.plan_date,
            start_date: self.start_date,
            end_date: self.end_date,
            is_template: self.is_template,
            is_public: self.is_public,
        };
        (patch, self.group_ids)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanGroupResponse {
    /// The association id.
    pub id: Uuid,
    pub group_id: Uuid,
    pub order_index: u32,
    pub group: TrainingGroupResponse,
}

impl From<PlanEntry> for PlanGroupResponse {
    fn from(value: PlanEntry) -> Self {
        PlanGroupResponse {
            id: value.association.id,
            group_id: value.association.group_id,
            order_index: value.association.order_index,
            group: value.group.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlanResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: PlanStatusDto,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: bool,
    pub is_public: bool,
    /// Ordered by `orderIndex`.
    pub groups: Vec<PlanGroupResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanDetails> for TrainingPlanResponse {
    fn from(value: PlanDetails) -> Self {
        let plan = value.plan;
        TrainingPlanResponse {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            status: plan.status.into(),
            plan_date: plan.plan_date,
            start_date: plan.start_date,
            end_date: plan.end_date,
            is_template: plan.is_template,
            is_public: plan.is_public,
            groups: value.entries.into_iter().map(Into::into).collect(),
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

//=========================================================================================
// Exercise Sessions
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SessionListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Sort direction on `sessionDate`. Defaults to newest first.
    #[param(value_type = Option<String>, example = "desc")]
    pub order: Option<SortOrderParam>,
    #[param(value_type = Option<String>, example = "IN_PROGRESS")]
    pub status: Option<SessionStatusDto>,
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub name: String,
    pub session_date: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<CreateSessionRequest> for NewSession {
    fn from(value: CreateSessionRequest) -> Self {
        NewSession {
            name: value.name,
            session_date: value.session_date,
            start_time: value.start_time,
            notes: value.notes,
        }
    }
}

/// Absent fields are left untouched. Any status may be set from any status.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub name: Option<String>,
    pub session_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<u32>,
    pub status: Option<SessionStatusDto>,
    pub notes: Option<String>,
}

impl From<UpdateSessionRequest> for SessionPatch {
    fn from(value: UpdateSessionRequest) -> Self {
        SessionPatch {
            name: value.name,
            session_date: value.session_date,
            start_time: value.start_time,
            end_time: value.end_time,
            total_duration_minutes: value.total_duration_minutes,
            status: value.status.map(Into::into),
            notes: value.notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSetRecordRequest {
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    /// Defaults to `false`.
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
}

impl From<CreateSetRecordRequest> for NewSetRecord {
    fn from(value: CreateSetRecordRequest) -> Self {
        NewSetRecord {
            set_number: value.set_number,
            reps: value.reps,
            weight: value.weight,
            rest_time_seconds: value.rest_time_seconds,
            is_completed: value.is_completed,
            notes: value.notes,
        }
    }
}

/// Set numbers must run 1..n in the order given.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub group_id: Option<Uuid>,
    pub exercise_ref: Uuid,
    pub order_index: u32,
    pub notes: Option<String>,
    #[serde(default)]
    pub sets: Vec<CreateSetRecordRequest>,
}

impl From<CreateRecordRequest> for NewRecord {
    fn from(value: CreateRecordRequest) -> Self {
        NewRecord {
            group_id: value.group_id,
            exercise_id: value.exercise_ref,
            order_index: value.order_index,
            notes: value.notes,
            sets: value.sets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSetRecordRequest {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
}

impl From<UpdateSetRecordRequest> for SetRecordPatch {
    fn from(value: UpdateSetRecordRequest) -> Self {
        SetRecordPatch {
            reps: value.reps,
            weight: value.weight,
            rest_time_seconds: value.rest_time_seconds,
            is_completed: value.is_completed,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetRecordResponse {
    pub id: Uuid,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub is_completed: bool,
    pub notes: Option<String>,
}

impl From<SetRecord> for SetRecordResponse {
    fn from(value: SetRecord) -> Self {
        SetRecordResponse {
            id: value.id,
            set_number: value.set_number,
            reps: value.reps,
            weight: value.weight,
            rest_time_seconds: value.rest_time_seconds,
            is_completed: value.is_completed,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecordResponse {
    pub id: Uuid,
    /// Null for records added by hand or whose group was deleted since.
    pub group_id: Option<Uuid>,
    pub exercise_ref: Uuid,
    pub order_index: u32,
    pub notes: Option<String>,
    pub sets: Vec<SetRecordResponse>,
}

impl From<ExerciseRecord> for ExerciseRecordResponse {
    fn from(value: ExerciseRecord) -> Self {
        ExerciseRecordResponse {
            id: value.id,
            group_id: value.group_id,
            exercise_ref: value.exercise_id,
            order_index: value.order_index,
            notes: value.notes,
            sets: value.sets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSessionResponse {
    pub id: Uuid,
    pub plan_id: Option<Uuid>,
    pub name: String,
    pub session_date: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<u32>,
    pub status: SessionStatusDto,
    pub notes: Option<String>,
    /// Ordered by `orderIndex`, each with its sets ordered by `setNumber`.
    pub records: Vec<ExerciseRecordResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExerciseSession> for ExerciseSessionResponse {
    fn from(value: ExerciseSession) -> Self {
        ExerciseSessionResponse {
            id: value.id,
            plan_id: value.plan_id,
            name: value.name,
            session_date: value.session_date,
            start_time: value.start_time,
            end_time: value.end_time,
            total_duration_minutes: value.total_duration_minutes,
            status: value.status.into(),
            notes: value.notes,
            records: value.records.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
