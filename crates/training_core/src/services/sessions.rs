//! Exercise sessions created by hand and edited in place.
//!
//! Status changes are not checked against the session state machine; callers may set
//! any status at any time.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::check_count;
use crate::domain::{ExerciseRecord, ExerciseSession, SessionStatus, SetRecord, TrainingGroup};
use crate::paging::Page;
use crate::ports::{PortError, PortResult, SessionQuery, SessionStore, TrainingGroupStore};

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub name: String,
    pub session_date: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub session_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<u32>,
    pub status: Option<SessionStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSetRecord {
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub group_id: Option<Uuid>,
    pub exercise_id: Uuid,
    pub order_index: u32,
    pub notes: Option<String>,
    pub sets: Vec<NewSetRecord>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct SetRecordPatch {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
}

pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    groups: Arc<dyn TrainingGroupStore>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionStore>, groups: Arc<dyn TrainingGroupStore>) -> Self {
        Self { sessions, groups }
    }

    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> PortResult<Page<ExerciseSession>> {
        self.sessions.list_sessions(user_id, query).await
    }

    pub async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<ExerciseSession> {
        self.sessions.get_session(user_id, session_id).await
    }

    /// Creates an empty session that is not tied to any plan.
    pub async fn create_session(&self, user_id: Uuid, input: NewSession) -> PortResult<ExerciseSession> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(PortError::Validation("name must not be empty".to_string()));
        }

        let now = Utc::now();
        let session = ExerciseSession {
            id: Uuid::new_v4(),
            user_id,
            plan_id: None,
            name,
            session_date: input.session_date,
            start_time: input.start_time,
            end_time: None,
            total_duration_minutes: None,
            status: SessionStatus::InProgress,
            notes: input.notes,
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.sessions.insert_session(&session).await?;
        info!(session_id = %session.id, owner = %user_id, "Exercise session created");
        Ok(session)
    }

    pub async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        patch: SessionPatch,
    ) -> PortResult<ExerciseSession> {
        let mut session = self.sessions.get_session(user_id, session_id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(PortError::Validation("name must not be empty".to_string()));
            }
            session.name = name;
        }
        if let Some(date) = patch.session_date {
            session.session_date = date;
        }
        if patch.start_time.is_some() {
            session.start_time = patch.start_time;
        }
        if patch.end_time.is_some() {
            session.end_time = patch.end_time;
        }
        if patch.total_duration_minutes.is_some() {
            check_count("totalDurationMinutes", patch.total_duration_minutes)?;
            session.total_duration_minutes = patch.total_duration_minutes;
        }
        if let Some(status) = patch.status {
            session.status = status;
        }
        if patch.notes.is_some() {
            session.notes = patch.notes;
        }
        if let (Some(start), Some(end)) = (session.start_time, session.end_time) {
            if end < start {
                return Err(PortError::Validation(
                    "endTime must not be before startTime".to_string(),
                ));
            }
        }
        session.updated_at = Utc::now();

        self.sessions.update_session(&session).await?;
        info!(session_id = %session.id, owner = %user_id, status = %session.status, "Exercise session updated");
        Ok(session)
    }

    /// Deletes the session and, with it, every record and set row.
    pub async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        self.sessions.delete_session(user_id, session_id).await?;
        info!(session_id = %session_id, owner = %user_id, "Exercise session deleted");
        Ok(())
    }

    /// Appends a record with caller-supplied set rows to an existing session.
    ///
    /// A `group_id` must name one of the caller's own groups.
    pub async fn add_record(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        input: NewRecord,
    ) -> PortResult<ExerciseRecord> {
        let session = self.sessions.get_session(user_id, session_id).await?;
        if let Some(group_id) = input.group_id {
            self.groups.get_group(user_id, group_id).await?;
        }
        check_count("orderIndex", Some(input.order_index))?;

        if session.records.iter().any(|r| r.order_index == input.order_index) {
            return Err(PortError::Conflict(format!(
                "Session {} already has a record at position {}",
                session_id, input.order_index
            )));
        }
        validate_set_numbers(&input.sets)?;

        let record_id = Uuid::new_v4();
        let record = ExerciseRecord {
            id: record_id,
            session_id,
            group_id: input.group_id,
            exercise_id: input.exercise_id,
            order_index: input.order_index,
            notes: input.notes,
            sets: input
                .sets
                .into_iter()
                .map(|s| SetRecord {
                    id: Uuid::new_v4(),
                    record_id,
                    set_number: s.set_number,
                    reps: s.reps,
                    weight: s.weight,
                    rest_time_seconds: s.rest_time_seconds,
                    is_completed: s.is_completed.unwrap_or(false),
                    notes: s.notes,
                })
                .collect(),
        };

        self.sessions.insert_record(user_id, &record).await?;
        info!(session_id = %session_id, record_id = %record.id, sets = record.sets.len(), "Exercise record added");
        Ok(record)
    }

    /// Edits one set row in place, e.g. to log the reps actually done or tick it off.
    pub async fn update_set(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        record_id: Uuid,
        set_id: Uuid,
        patch: SetRecordPatch,
    ) -> PortResult<SetRecord> {
        let session = self.sessions.get_session(user_id, session_id).await?;
        let mut set = session
            .records
            .into_iter()
            .find(|r| r.id == record_id)
            .and_then(|r| r.sets.into_iter().find(|s| s.id == set_id))
            .ok_or_else(|| PortError::NotFound(format!("Set {} not found", set_id)))?;

        check_count("reps", patch.reps)?;
        check_count("restTimeSeconds", patch.rest_time_seconds)?;
        if patch.reps.is_some() {
            set.reps = patch.reps;
        }
        if let Some(weight) = patch.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PortError::Validation(
                    "weight must be a non-negative number".to_string(),
                ));
            }
            set.weight = Some(weight);
        }
        if patch.rest_time_seconds.is_some() {
            set.rest_time_seconds = patch.rest_time_seconds;
        }
        if let Some(done) = patch.is_completed {
            set.is_completed = done;
        }
        if patch.notes.is_some() {
            set.notes = patch.notes;
        }

        self.sessions.update_set_record(user_id, session_id, &set).await?;
        Ok(set)
    }
}

/// Set numbers must run 1, 2, 3, ... in the order given.
fn validate_set_numbers(sets: &[NewSetRecord]) -> PortResult<()> {
    if sets.len() > TrainingGroup::MAX_SETS as usize {
        return Err(PortError::Validation(format!(
            "a record holds at most {} sets",
            TrainingGroup::MAX_SETS
        )));
    }
    let mut seen = HashSet::new();
    for (expected, set) in (1u32..).zip(sets) {
        check_count("reps", set.reps)?;
        check_count("restTimeSeconds", set.rest_time_seconds)?;
        if !seen.insert(set.set_number) {
            return Err(PortError::Validation(format!(
                "setNumber {} appears more than once",
                set.set_number
            )));
        }
        if set.set_number != expected {
            return Err(PortError::Validation(format!(
                "setNumber must be sequential starting at 1, expected {} but got {}",
                expected, set.set_number
            )));
        }
        if let Some(w) = set.weight {
            if !w.is_finite() || w < 0.0 {
                return Err(PortError::Validation(
                    "weight must be a non-negative number".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::paging::{PageRequest, SortOrder};
    use crate::services::groups::{GroupService, NewTrainingGroup};
    use chrono::{Duration, TimeZone};

    fn service() -> (Arc<InMemoryStore>, SessionService) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), SessionService::new(store.clone(), store))
    }

    fn session_named(name: &str, day: u32) -> NewSession {
        NewSession {
            name: name.to_string(),
            session_date: Utc.with_ymd_and_hms(2026, 5, day, 7, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    fn sets(n: u32) -> Vec<NewSetRecord> {
        (1..=n)
            .map(|set_number| NewSetRecord {
                set_number,
                reps: Some(10),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn manual_session_starts_empty_and_in_progress() {
        let (_, svc) = service();
        let session = svc.create_session(Uuid::new_v4(), session_named("Run", 1)).await.unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.plan_id.is_none());
        assert!(session.records.is_empty());
    }

    #[tokio::test]
    async fn add_record_creates_sets_with_defaults() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 2)).await.unwrap();
        let mut input_sets = sets(3);
        input_sets[0].is_completed = Some(true);

        let record = svc
            .add_record(
                owner,
                session.id,
                NewRecord {
                    exercise_id: Uuid::new_v4(),
                    order_index: 0,
                    sets: input_sets,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let completed: Vec<_> = record.sets.iter().map(|s| s.is_completed).collect();
        assert_eq!(completed, vec![true, false, false]);

        let stored = svc.get_session(owner, session.id).await.unwrap();
        assert_eq!(stored.records.len(), 1);
        assert_eq!(stored.records[0].sets.len(), 3);
    }

    #[tokio::test]
    async fn add_record_rejects_gaps_in_set_numbers() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 2)).await.unwrap();
        let mut bad = sets(3);
        bad[2].set_number = 5;

        let err = svc
            .add_record(
                owner,
                session.id,
                NewRecord {
                    exercise_id: Uuid::new_v4(),
                    sets: bad,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert!(svc.get_session(owner, session.id).await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn add_record_rejects_taken_position() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 2)).await.unwrap();
        let record = || NewRecord {
            exercise_id: Uuid::new_v4(),
            order_index: 0,
            ..Default::default()
        };
        svc.add_record(owner, session.id, record()).await.unwrap();
        let err = svc.add_record(owner, session.id, record()).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn add_record_to_foreign_session_is_not_found() {
        let (_, svc) = service();
        let session = svc
            .create_session(Uuid::new_v4(), session_named("Gym", 2))
            .await
            .unwrap();
        let err = svc
            .add_record(Uuid::new_v4(), session.id, NewRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn add_record_checks_the_group_owner() {
        let (store, svc) = service();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let groups = GroupService::new(store.clone(), store.clone());
        let alice_group = groups
            .create_group(
                alice,
                NewTrainingGroup {
                    name: "Bench".to_string(),
                    exercise_id: store.add_exercise(),
                    sets: 3,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let session = svc.create_session(bob, session_named("Gym", 2)).await.unwrap();

        for group_id in [alice_group.id, Uuid::new_v4()] {
            let err = svc
                .add_record(
                    bob,
                    session.id,
                    NewRecord {
                        group_id: Some(group_id),
                        exercise_id: alice_group.exercise_id,
                        sets: sets(1),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, PortError::NotFound(_)));
        }
        assert!(svc.get_session(bob, session.id).await.unwrap().records.is_empty());

        let own = svc.create_session(alice, session_named("Gym", 3)).await.unwrap();
        let record = svc
            .add_record(
                alice,
                own.id,
                NewRecord {
                    group_id: Some(alice_group.id),
                    exercise_id: alice_group.exercise_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(record.group_id, Some(alice_group.id));
    }

    #[tokio::test]
    async fn add_record_rejects_counts_that_do_not_fit() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 2)).await.unwrap();

        let mut huge_reps = sets(1);
        huge_reps[0].reps = Some(u32::MAX);
        let too_many = sets(TrainingGroup::MAX_SETS + 1);
        let inputs = [
            NewRecord {
                sets: huge_reps,
                ..Default::default()
            },
            NewRecord {
                sets: too_many,
                ..Default::default()
            },
            NewRecord {
                order_index: u32::MAX,
                ..Default::default()
            },
        ];
        for input in inputs {
            let err = svc.add_record(owner, session.id, input).await.unwrap_err();
            assert!(matches!(err, PortError::Validation(_)));
        }

        let err = svc
            .update_session(
                owner,
                session.id,
                SessionPatch {
                    total_duration_minutes: Some(u32::MAX),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn status_changes_are_not_restricted() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Swim", 3)).await.unwrap();

        for status in [SessionStatus::Completed, SessionStatus::InProgress, SessionStatus::Cancelled] {
            let updated = svc
                .update_session(
                    owner,
                    session.id,
                    SessionPatch {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let start = Utc::now();
        let mut input = session_named("Row", 4);
        input.start_time = Some(start);
        let session = svc.create_session(owner, input).await.unwrap();

        let err = svc
            .update_session(
                owner,
                session.id,
                SessionPatch {
                    end_time: Some(start - Duration::minutes(5)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn update_set_marks_completion() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 5)).await.unwrap();
        let record = svc
            .add_record(
                owner,
                session.id,
                NewRecord {
                    exercise_id: Uuid::new_v4(),
                    sets: sets(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let target = record.sets[1].id;

        let set = svc
            .update_set(
                owner,
                session.id,
                record.id,
                target,
                SetRecordPatch {
                    reps: Some(12),
                    is_completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(set.is_completed);

        let stored = svc.get_session(owner, session.id).await.unwrap();
        let stored_set = &stored.records[0].sets[1];
        assert_eq!(stored_set.reps, Some(12));
        assert!(stored_set.is_completed);
        assert!(!stored.records[0].sets[0].is_completed);
    }

    #[tokio::test]
    async fn delete_removes_the_whole_tree() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        let session = svc.create_session(owner, session_named("Gym", 6)).await.unwrap();
        svc.add_record(
            owner,
            session.id,
            NewRecord {
                exercise_id: Uuid::new_v4(),
                sets: sets(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        svc.delete_session(owner, session.id).await.unwrap();
        assert!(matches!(
            svc.get_session(owner, session.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_session(owner, session.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_sorts_by_session_date() {
        let (_, svc) = service();
        let owner = Uuid::new_v4();
        for (name, day) in [("b", 2), ("a", 1), ("c", 3)] {
            svc.create_session(owner, session_named(name, day)).await.unwrap();
        }

        let asc = svc
            .list_sessions(
                owner,
                &SessionQuery {
                    order: SortOrder::Asc,
                    page: PageRequest::new(1, 2, 100).unwrap(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let names: Vec<_> = asc.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(asc.total, 3);
        assert_eq!(asc.total_pages, 2);

        let desc = svc.list_sessions(owner, &SessionQuery::default()).await.unwrap();
        assert_eq!(desc.items[0].name, "c");
    }
}
