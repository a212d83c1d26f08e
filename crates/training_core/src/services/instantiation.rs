//! Starting a plan: turning its group templates into a new, independent session.
//!
//! The whole session tree is assembled in memory first and handed to the store in
//! one call, so either the complete session exists afterwards or nothing does.
//! Starting is not idempotent; every call produces a new session.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{ExerciseRecord, ExerciseSession, SessionStatus, TrainingGroup, TrainingPlan};
use crate::ports::{PlanStore, PortError, PortResult, SessionStore, TrainingGroupStore};
use crate::sets::planned_sets;

pub struct InstantiationService {
    plans: Arc<dyn PlanStore>,
    groups: Arc<dyn TrainingGroupStore>,
    sessions: Arc<dyn SessionStore>,
}

impl InstantiationService {
    pub fn new(
        plans: Arc<dyn PlanStore>,
        groups: Arc<dyn TrainingGroupStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            plans,
            groups,
            sessions,
        }
    }

    pub async fn start_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<ExerciseSession> {
        let plan = self.plans.get_plan(user_id, plan_id).await?;

        let mut group_ids = plan.group_ids();
        group_ids.sort();
        group_ids.dedup();
        let groups: HashMap<Uuid, TrainingGroup> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            self.groups
                .get_groups(user_id, &group_ids)
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        let session = build_session(&plan, &groups, Utc::now())?;
        self.sessions.insert_session(&session).await?;

        info!(
            plan_id = %plan.id,
            session_id = %session.id,
            owner = %user_id,
            records = session.records.len(),
            sets = session.records.iter().map(|r| r.sets.len()).sum::<usize>(),
            "Training plan started"
        );
        Ok(session)
    }
}

/// Assembles the session tree for `plan` without touching storage.
///
/// Record `i` comes from the association at position `i` of the plan's ordered list.
pub fn build_session(
    plan: &TrainingPlan,
    groups: &HashMap<Uuid, TrainingGroup>,
    now: DateTime<Utc>,
) -> PortResult<ExerciseSession> {
    let session_id = Uuid::new_v4();

    let mut associations: Vec<_> = plan.associations.iter().collect();
    associations.sort_by_key(|a| a.order_index);

    let mut records = Vec::with_capacity(associations.len());
    for (association, order_index) in associations.into_iter().zip(0u32..) {
        let group = groups.get(&association.group_id).ok_or_else(|| {
            PortError::Unexpected(format!(
                "Plan {} references missing group {}",
                plan.id, association.group_id
            ))
        })?;

        let record_id = Uuid::new_v4();
        records.push(ExerciseRecord {
            id: record_id,
            session_id,
            group_id: Some(group.id),
            exercise_id: group.exercise_id,
            order_index,
            notes: None,
            sets: planned_sets(group)
                .into_iter()
                .map(|set| set.into_record(record_id))
                .collect(),
        });
    }

    Ok(ExerciseSession {
        id: session_id,
        user_id: plan.user_id,
        plan_id: Some(plan.id),
        name: plan.name.clone(),
        session_date: now,
        start_time: Some(now),
        end_time: None,
        total_duration_minutes: None,
        status: SessionStatus::InProgress,
        notes: None,
        records,
        created_at: now,
        updated_at: now,
    })
}
