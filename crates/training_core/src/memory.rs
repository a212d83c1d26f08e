//! crates/training_core/src/memory.rs
//!
//! An in-memory implementation of every store port. Backs the service tests and the
//! `memory` storage backend of the API.
//!
//! Each write works on a staged copy of the affected aggregate and only swaps it in
//! once every row has been accepted, all under one lock. It enforces the same
//! uniqueness rules as the SQL schema.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{ExerciseRecord, ExerciseSession, SetRecord, TrainingGroup, TrainingPlan};
use crate::paging::{Page, SortOrder};
use crate::ports::{
    ExerciseCatalog, GroupQuery, GroupSortField, PlanQuery, PlanStore, PortError, PortResult,
    SessionQuery, SessionStore, TrainingGroupStore,
};

#[derive(Default)]
struct Tables {
    exercises: HashSet<Uuid>,
    groups: HashMap<Uuid, TrainingGroup>,
    plans: HashMap<Uuid, TrainingPlan>,
    sessions: HashMap<Uuid, ExerciseSession>,
}

pub struct InMemoryStore {
    tables: Mutex<Tables>,
    /// Remaining set-row writes before an injected failure. `usize::MAX` disables it.
    #[cfg(test)]
    set_write_budget: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            #[cfg(test)]
            set_write_budget: AtomicUsize::new(usize::MAX),
        }
    }

    /// Registers a new catalog exercise and returns its id.
    pub fn add_exercise(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.register_exercise(id);
        id
    }

    pub fn register_exercise(&self, exercise_id: Uuid) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.exercises.insert(exercise_id);
        }
    }

    /// Makes the set-row write after the next `n` fail, as a storage fault would.
    #[cfg(test)]
    pub fn fail_set_writes_after(&self, n: usize) {
        self.set_write_budget.store(n, Ordering::SeqCst);
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }

    #[cfg(test)]
    fn write_set_row(&self, set: &SetRecord) -> PortResult<()> {
        let budget = self.set_write_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return Err(PortError::Unexpected(format!(
                "Failed to insert set record {}",
                set.id
            )));
        }
        if budget != usize::MAX {
            self.set_write_budget.store(budget - 1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Checks one record the way the schema's unique constraints would.
    fn stage_record(&self, record: &ExerciseRecord) -> PortResult<()> {
        let mut numbers = HashSet::new();
        for set in &record.sets {
            if !numbers.insert(set.set_number) {
                return Err(PortError::Conflict(format!(
                    "Duplicate set number {} in record {}",
                    set.set_number, record.id
                )));
            }
            #[cfg(test)]
            self.write_set_row(set)?;
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_session(session: &mut ExerciseSession) {
    session.records.sort_by_key(|r| r.order_index);
    for record in &mut session.records {
        record.sets.sort_by_key(|s| s.set_number);
    }
}

fn ordered<T>(mut items: Vec<T>, order: SortOrder, cmp: impl Fn(&T, &T) -> std::cmp::Ordering) -> Vec<T> {
    items.sort_by(|a, b| match order {
        SortOrder::Asc => cmp(a, b),
        SortOrder::Desc => cmp(b, a),
    });
    items
}

//=========================================================================================
// `ExerciseCatalog` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExerciseCatalog for InMemoryStore {
    async fn exercise_exists(&self, exercise_id: Uuid) -> PortResult<bool> {
        Ok(self.tables()?.exercises.contains(&exercise_id))
    }
}

//=========================================================================================
// `TrainingGroupStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrainingGroupStore for InMemoryStore {
    async fn list_groups(&self, user_id: Uuid, query: &GroupQuery) -> PortResult<Page<TrainingGroup>> {
        let tables = self.tables()?;
        let mine: Vec<_> = tables
            .groups
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        let sorted = ordered(mine, query.order, |a, b| match query.sort_by {
            GroupSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            GroupSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            GroupSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        });
        Ok(Page::from_slice(sorted, query.page))
    }

    async fn get_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<TrainingGroup> {
        self.tables()?
            .groups
            .get(&group_id)
            .filter(|g| g.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Training group {} not found", group_id)))
    }

    async fn get_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> PortResult<Vec<TrainingGroup>> {
        let tables = self.tables()?;
        Ok(group_ids
            .iter()
            .filter_map(|id| tables.groups.get(id))
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_group(&self, group: &TrainingGroup) -> PortResult<()> {
        let mut tables = self.tables()?;
        if tables.groups.contains_key(&group.id) {
            return Err(PortError::Conflict(format!("Training group {} already exists", group.id)));
        }
        let mut staged = group.clone();
        staged.set_templates.sort_by_key(|t| t.set_number);
        tables.groups.insert(staged.id, staged);
        Ok(())
    }

    async fn update_group(&self, group: &TrainingGroup, replace_set_templates: bool) -> PortResult<()> {
        let mut tables = self.tables()?;
        let stored = tables
            .groups
            .get_mut(&group.id)
            .filter(|g| g.user_id == group.user_id)
            .ok_or_else(|| PortError::NotFound(format!("Training group {} not found", group.id)))?;

        let mut staged = group.clone();
        if replace_set_templates {
            staged.set_templates.sort_by_key(|t| t.set_number);
        } else {
            staged.set_templates = stored.set_templates.clone();
        }
        *stored = staged;
        Ok(())
    }

    async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        match tables.groups.get(&group_id) {
            Some(g) if g.user_id == user_id => {}
            _ => return Err(PortError::NotFound(format!("Training group {} not found", group_id))),
        }
        tables.groups.remove(&group_id);

        // Associations of soft-deleted plans go with the group; session history keeps the row.
        for plan in tables.plans.values_mut() {
            plan.associations.retain(|a| a.group_id != group_id);
        }
        for record in tables.sessions.values_mut().flat_map(|s| s.records.iter_mut()) {
            if record.group_id == Some(group_id) {
                record.group_id = None;
            }
        }
        Ok(())
    }

    async fn count_active_plan_references(&self, user_id: Uuid, group_id: Uuid) -> PortResult<u64> {
        let tables = self.tables()?;
        Ok(tables
            .plans
            .values()
            .filter(|p| p.user_id == user_id && p.is_active)
            .filter(|p| p.associations.iter().any(|a| a.group_id == group_id))
            .count() as u64)
    }
}

//=========================================================================================
// `PlanStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanStore for InMemoryStore {
    async fn list_plans(&self, user_id: Uuid, query: &PlanQuery) -> PortResult<Page<TrainingPlan>> {
        let tables = self.tables()?;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<_> = tables
            .plans
            .values()
            .filter(|p| p.user_id == user_id && p.is_active)
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .filter(|p| match &needle {
                Some(n) => {
                    p.name.to_lowercase().contains(n)
                        || p.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n))
                }
                None => true,
            })
            .cloned()
            .collect();
        let sorted = ordered(matching, SortOrder::Desc, |a, b| a.created_at.cmp(&b.created_at));
        Ok(Page::from_slice(sorted, query.page))
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<TrainingPlan> {
        self.tables()?
            .plans
            .get(&plan_id)
            .filter(|p| p.user_id == user_id && p.is_active)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Training plan {} not found", plan_id)))
    }

    async fn insert_plan(&self, plan: &TrainingPlan) -> PortResult<()> {
        let mut tables = self.tables()?;
        if tables.plans.contains_key(&plan.id) {
            return Err(PortError::Conflict(format!("Training plan {} already exists", plan.id)));
        }
        let mut staged = plan.clone();
        check_association_order(&staged)?;
        staged.associations.sort_by_key(|a| a.order_index);
        tables.plans.insert(staged.id, staged);
        Ok(())
    }

    async fn update_plan(&self, plan: &TrainingPlan, replace_associations: bool) -> PortResult<()> {
        let mut tables = self.tables()?;
        let stored = tables
            .plans
            .get_mut(&plan.id)
            .filter(|p| p.user_id == plan.user_id && p.is_active)
            .ok_or_else(|| PortError::NotFound(format!("Training plan {} not found", plan.id)))?;

        let mut staged = plan.clone();
        if replace_associations {
            check_association_order(&staged)?;
            staged.associations.sort_by_key(|a| a.order_index);
        } else {
            staged.associations = stored.associations.clone();
        }
        *stored = staged;
        Ok(())
    }

    async fn deactivate_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        if tables.sessions.values().any(|s| s.plan_id == Some(plan_id)) {
            return Err(PortError::Conflict(format!(
                "Training plan {} has associated sessions",
                plan_id
            )));
        }
        let plan = tables
            .plans
            .get_mut(&plan_id)
            .filter(|p| p.user_id == user_id && p.is_active)
            .ok_or_else(|| PortError::NotFound(format!("Training plan {} not found", plan_id)))?;
        plan.is_active = false;
        Ok(())
    }

    async fn count_sessions_for_plan(&self, plan_id: Uuid) -> PortResult<u64> {
        let tables = self.tables()?;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.plan_id == Some(plan_id))
            .count() as u64)
    }
}

fn check_association_order(plan: &TrainingPlan) -> PortResult<()> {
    let mut seen = HashSet::new();
    for association in &plan.associations {
        if !seen.insert(association.order_index) {
            return Err(PortError::Conflict(format!(
                "Duplicate order index {} in plan {}",
                association.order_index, plan.id
            )));
        }
    }
    Ok(())
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> PortResult<Page<ExerciseSession>> {
        let tables = self.tables()?;
        let matching: Vec<_> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| query.status.map_or(true, |st| s.status == st))
            .filter(|s| query.plan_id.map_or(true, |p| s.plan_id == Some(p)))
            .cloned()
            .collect();
        let sorted = ordered(matching, query.order, |a, b| {
            a.session_date
                .cmp(&b.session_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(Page::from_slice(sorted, query.page))
    }

    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<ExerciseSession> {
        self.tables()?
            .sessions
            .get(&session_id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn insert_session(&self, session: &ExerciseSession) -> PortResult<()> {
        let mut tables = self.tables()?;
        if tables.sessions.contains_key(&session.id) {
            return Err(PortError::Conflict(format!("Session {} already exists", session.id)));
        }
        if let Some(plan_id) = session.plan_id {
            let usable = tables
                .plans
                .get(&plan_id)
                .is_some_and(|p| p.user_id == session.user_id && p.is_active);
            if !usable {
                return Err(PortError::NotFound(format!("Training plan {} not found", plan_id)));
            }
        }

        let mut positions = HashSet::new();
        for record in &session.records {
            if !positions.insert(record.order_index) {
                return Err(PortError::Conflict(format!(
                    "Duplicate order index {} in session {}",
                    record.order_index, session.id
                )));
            }
            self.stage_record(record)?;
        }

        let mut staged = session.clone();
        sort_session(&mut staged);
        tables.sessions.insert(staged.id, staged);
        Ok(())
    }

    async fn update_session(&self, session: &ExerciseSession) -> PortResult<()> {
        let mut tables = self.tables()?;
        let stored = tables
            .sessions
            .get_mut(&session.id)
            .filter(|s| s.user_id == session.user_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session.id)))?;

        let records = std::mem::take(&mut stored.records);
        *stored = ExerciseSession {
            records,
            ..session.clone()
        };
        Ok(())
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        let owned = tables
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.user_id == user_id);
        if !owned {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }
        tables.sessions.remove(&session_id);
        Ok(())
    }

    async fn insert_record(&self, user_id: Uuid, record: &ExerciseRecord) -> PortResult<()> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;
        let groups = &tables.groups;
        let session = tables
            .sessions
            .get_mut(&record.session_id)
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", record.session_id)))?;
        if let Some(group_id) = record.group_id {
            if !groups.get(&group_id).is_some_and(|g| g.user_id == user_id) {
                return Err(PortError::NotFound(format!("Training group {} not found", group_id)));
            }
        }

        if session.records.iter().any(|r| r.order_index == record.order_index) {
            return Err(PortError::Conflict(format!(
                "Duplicate order index {} in session {}",
                record.order_index, record.session_id
            )));
        }
        self.stage_record(record)?;

        session.records.push(record.clone());
        sort_session(session);
        Ok(())
    }

    async fn update_set_record(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        set: &SetRecord,
    ) -> PortResult<()> {
        let mut tables = self.tables()?;
        let stored = tables
            .sessions
            .get_mut(&session_id)
            .filter(|s| s.user_id == user_id)
            .and_then(|s| s.records.iter_mut().find(|r| r.id == set.record_id))
            .and_then(|r| r.sets.iter_mut().find(|s| s.id == set.id))
            .ok_or_else(|| PortError::NotFound(format!("Set {} not found", set.id)))?;

        *stored = SetRecord {
            set_number: stored.set_number,
            ..set.clone()
        };
        Ok(())
    }
}
