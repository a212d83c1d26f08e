//! crates/training_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.
//!
//! Every method takes the owning user's id where it touches user data, and every
//! method that writes more than one row must apply all of it or none of it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ExerciseRecord, ExerciseSession, PlanStatus, SessionStatus, SetRecord, TrainingGroup,
    TrainingPlan,
};
use crate::paging::{Page, PageRequest, SortOrder};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The entity is absent or belongs to somebody else. Callers cannot tell which.
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PortError::NotFound(_) => "not_found",
            PortError::Validation(_) => "validation_error",
            PortError::Conflict(_) => "conflict",
            PortError::Unexpected(_) => "internal_error",
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// List Queries
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSortField {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Default)]
pub struct GroupQuery {
    pub sort_by: GroupSortField,
    pub order: SortOrder,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct PlanQuery {
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    pub status: Option<PlanStatus>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub status: Option<SessionStatus>,
    pub plan_id: Option<Uuid>,
    /// Applied to `session_date`.
    pub order: SortOrder,
    pub page: PageRequest,
}

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TrainingGroupStore: Send + Sync {
    async fn list_groups(&self, user_id: Uuid, query: &GroupQuery) -> PortResult<Page<TrainingGroup>>;

    async fn get_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<TrainingGroup>;

    /// Loads every listed group owned by `user_id`. Missing ids are skipped, not reported.
    async fn get_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> PortResult<Vec<TrainingGroup>>;

    /// Inserts the group and its set templates atomically.
    async fn insert_group(&self, group: &TrainingGroup) -> PortResult<()>;

    /// Updates the scalar fields and, when `replace_set_templates` is set, swaps the
    /// stored set templates for `group.set_templates` in the same transaction.
    async fn update_group(&self, group: &TrainingGroup, replace_set_templates: bool) -> PortResult<()>;

    async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<()>;

    /// Number of active plans that reference the group.
    async fn count_active_plan_references(&self, user_id: Uuid, group_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Lists active plans only.
    async fn list_plans(&self, user_id: Uuid, query: &PlanQuery) -> PortResult<Page<TrainingPlan>>;

    /// Returns the active plan with its associations sorted by `order_index`.
    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<TrainingPlan>;

    /// Inserts the plan and all of its associations atomically.
    async fn insert_plan(&self, plan: &TrainingPlan) -> PortResult<()>;

    /// Updates the scalar fields and, when `replace_associations` is set, deletes every
    /// stored association and recreates them from `plan.associations`, atomically.
    async fn update_plan(&self, plan: &TrainingPlan, replace_associations: bool) -> PortResult<()>;

    /// Soft-deletes the plan. Fails with `Conflict` if any session references it.
    async fn deactivate_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<()>;

    async fn count_sessions_for_plan(&self, plan_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> PortResult<Page<ExerciseSession>>;

    /// Returns the session with records sorted by `order_index` and sets by `set_number`.
    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<ExerciseSession>;

    /// Inserts the whole session tree atomically.
    async fn insert_session(&self, session: &ExerciseSession) -> PortResult<()>;

    /// Updates the session's scalar fields. Records are not touched.
    async fn update_session(&self, session: &ExerciseSession) -> PortResult<()>;

    /// Deletes the session together with its records and set rows.
    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()>;

    /// Appends a record and its set rows to a session owned by `user_id`, atomically.
    async fn insert_record(&self, user_id: Uuid, record: &ExerciseRecord) -> PortResult<()>;

    /// Overwrites the values of one set row inside a session owned by `user_id`.
    async fn update_set_record(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        set: &SetRecord,
    ) -> PortResult<()>;
}

/// The exercise catalog is owned by another component; only existence is checked here.
#[async_trait]
pub trait ExerciseCatalog: Send + Sync {
    async fn exercise_exists(&self, exercise_id: Uuid) -> PortResult<bool>;
}
