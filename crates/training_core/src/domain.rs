//! crates/training_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Returned when a status string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} status: '{value}'")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

//=========================================================================================
// Training Group Templates
//=========================================================================================

/// A reusable exercise template owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub exercise_id: Uuid,
    pub sets: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub rest_time_seconds: u32,
    pub notes: Option<String>,
    /// Explicit per-set rows. When non-empty these win over the range fields.
    pub set_templates: Vec<SetTemplate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingGroup {
    pub const DEFAULT_REST_TIME_SECONDS: u32 = 60;
    /// Upper bound for `sets` and for the number of set rows in one record.
    pub const MAX_SETS: u32 = 100;
}

/// Largest value any stored count may take. Counts live in `INTEGER` columns.
pub const MAX_COUNT: u32 = i32::MAX as u32;

/// One explicit set inside a training group template.
#[derive(Debug, Clone, PartialEq)]
pub struct SetTemplate {
    pub id: Uuid,
    pub group_id: Uuid,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
}

//=========================================================================================
// Training Plans
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "DRAFT",
            PlanStatus::Active => "ACTIVE",
            PlanStatus::Completed => "COMPLETED",
            PlanStatus::Paused => "PAUSED",
            PlanStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PlanStatus::Draft),
            "ACTIVE" => Ok(PlanStatus::Active),
            "COMPLETED" => Ok(PlanStatus::Completed),
            "PAUSED" => Ok(PlanStatus::Paused),
            "CANCELLED" => Ok(PlanStatus::Cancelled),
            _ => Err(ParseStatusError {
                kind: "plan",
                value: s.to_string(),
            }),
        }
    }
}

/// An ordered collection of training group references.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: PlanStatus,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: bool,
    pub is_public: bool,
    /// Soft-delete flag. Inactive plans are invisible but still referenced by sessions.
    pub is_active: bool,
    /// Sorted by `order_index`.
    pub associations: Vec<PlanGroupAssociation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingPlan {
    pub fn group_ids(&self) -> Vec<Uuid> {
        self.associations.iter().map(|a| a.group_id).collect()
    }
}

/// The ordered link between a plan and a group it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanGroupAssociation {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub group_id: Uuid,
    pub order_index: u32,
}

//=========================================================================================
// Exercise Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    InProgress,
    Completed,
    Paused,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Completed and cancelled sessions are finished. Nothing enforces this on update.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => Ok(SessionStatus::InProgress),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "PAUSED" => Ok(SessionStatus::Paused),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            _ => Err(ParseStatusError {
                kind: "session",
                value: s.to_string(),
            }),
        }
    }
}

/// A concrete, timestamped workout. Independent of the plan it may have come from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub name: String,
    pub session_date: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<u32>,
    pub status: SessionStatus,
    pub notes: Option<String>,
    /// Sorted by `order_index`.
    pub records: Vec<ExerciseRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One exercise performed within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub group_id: Option<Uuid>,
    pub exercise_id: Uuid,
    pub order_index: u32,
    pub notes: Option<String>,
    /// Sorted by `set_number`.
    pub sets: Vec<SetRecord>,
}

/// The performance data of a single set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRecord {
    pub id: Uuid,
    pub record_id: Uuid,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub is_completed: bool,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!("draft".parse::<PlanStatus>(), Ok(PlanStatus::Draft));
        assert_eq!("In_Progress".parse::<SessionStatus>(), Ok(SessionStatus::InProgress));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "ARCHIVED".parse::<PlanStatus>().unwrap_err();
        assert_eq!(err.kind, "plan");
        assert_eq!(err.value, "ARCHIVED");
    }

    #[test]
    fn status_strings_round_through_display() {
        for status in [
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Paused,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<SessionStatus>(), Ok(status));
        }
    }
}
