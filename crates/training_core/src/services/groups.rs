//! Training group templates: create, update, delete and read.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::check_count;
use crate::domain::{SetTemplate, TrainingGroup};
use crate::paging::Page;
use crate::ports::{ExerciseCatalog, GroupQuery, PortError, PortResult, TrainingGroupStore};

/// One explicit set in a create or update request. Set numbers come from list position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetTemplateInput {
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTrainingGroup {
    pub name: String,
    pub exercise_id: Uuid,
    pub sets: u32,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
    pub set_templates: Vec<SetTemplateInput>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct TrainingGroupPatch {
    pub name: Option<String>,
    pub exercise_id: Option<Uuid>,
    pub sets: Option<u32>,
    pub reps_min: Option<u32>,
    pub reps_max: Option<u32>,
    pub weight_min: Option<f64>,
    pub weight_max: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
    /// `Some` replaces every stored set template, `Some(vec![])` removes them all.
    pub set_templates: Option<Vec<SetTemplateInput>>,
}

pub struct GroupService {
    groups: Arc<dyn TrainingGroupStore>,
    catalog: Arc<dyn ExerciseCatalog>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn TrainingGroupStore>, catalog: Arc<dyn ExerciseCatalog>) -> Self {
        Self { groups, catalog }
    }

    pub async fn list_groups(&self, user_id: Uuid, query: &GroupQuery) -> PortResult<Page<TrainingGroup>> {
        self.groups.list_groups(user_id, query).await
    }

    pub async fn get_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<TrainingGroup> {
        self.groups.get_group(user_id, group_id).await
    }

    pub async fn create_group(&self, user_id: Uuid, input: NewTrainingGroup) -> PortResult<TrainingGroup> {
        self.ensure_exercise_exists(input.exercise_id).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let group = TrainingGroup {
            id,
            user_id,
            name: input.name.trim().to_string(),
            exercise_id: input.exercise_id,
            sets: input.sets,
            reps_min: input.reps_min,
            reps_max: input.reps_max,
            weight_min: input.weight_min,
            weight_max: input.weight_max,
            rest_time_seconds: input
                .rest_time_seconds
                .unwrap_or(TrainingGroup::DEFAULT_REST_TIME_SECONDS),
            notes: input.notes,
            set_templates: build_set_templates(id, input.set_templates),
            created_at: now,
            updated_at: now,
        };
        validate_group(&group)?;

        self.groups.insert_group(&group).await?;
        info!(group_id = %group.id, owner = %user_id, "Training group created");
        Ok(group)
    }

    pub async fn update_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        patch: TrainingGroupPatch,
    ) -> PortResult<TrainingGroup> {
        let mut group = self.groups.get_group(user_id, group_id).await?;

        if let Some(exercise_id) = patch.exercise_id {
            if exercise_id != group.exercise_id {
                self.ensure_exercise_exists(exercise_id).await?;
                group.exercise_id = exercise_id;
            }
        }
        if let Some(name) = patch.name {
            group.name = name.trim().to_string();
        }
        if let Some(sets) = patch.sets {
            group.sets = sets;
        }
        if patch.reps_min.is_some() {
            group.reps_min = patch.reps_min;
        }
        if patch.reps_max.is_some() {
            group.reps_max = patch.reps_max;
        }
        if patch.weight_min.is_some() {
            group.weight_min = patch.weight_min;
        }
        if patch.weight_max.is_some() {
            group.weight_max = patch.weight_max;
        }
        if let Some(rest) = patch.rest_time_seconds {
            group.rest_time_seconds = rest;
        }
        if patch.notes.is_some() {
            group.notes = patch.notes;
        }
        let replace_set_templates = patch.set_templates.is_some();
        if let Some(templates) = patch.set_templates {
            group.set_templates = build_set_templates(group.id, templates);
        }
        group.updated_at = Utc::now();
        validate_group(&group)?;

        self.groups.update_group(&group, replace_set_templates).await?;
        info!(group_id = %group.id, owner = %user_id, "Training group updated");
        Ok(group)
    }

    /// Deletes a group unless an active plan still references it.
    pub async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<()> {
        self.groups.get_group(user_id, group_id).await?;

        let references = self.groups.count_active_plan_references(user_id, group_id).await?;
        if references > 0 {
            warn!(group_id = %group_id, references, "Refusing to delete referenced training group");
            return Err(PortError::Conflict(format!(
                "Training group {} is used by {} training plan(s)",
                group_id, references
            )));
        }

        self.groups.delete_group(user_id, group_id).await?;
        info!(group_id = %group_id, owner = %user_id, "Training group deleted");
        Ok(())
    }

    async fn ensure_exercise_exists(&self, exercise_id: Uuid) -> PortResult<()> {
        if self.catalog.exercise_exists(exercise_id).await? {
            Ok(())
        } else {
            Err(PortError::Validation(format!("Exercise {} does not exist", exercise_id)))
        }
    }
}

fn build_set_templates(group_id: Uuid, inputs: Vec<SetTemplateInput>) -> Vec<SetTemplate> {
    inputs
        .into_iter()
        .zip(1u32..)
        .map(|(input, set_number)| SetTemplate {
            id: Uuid::new_v4(),
            group_id,
            set_number,
            reps: input.reps,
            weight: input.weight,
            rest_time_seconds: input.rest_time_seconds,
            notes: input.notes,
        })
        .collect()
}

/// Checks the invariants of a group template before it is written.
pub fn validate_group(group: &TrainingGroup) -> PortResult<()> {
    if group.name.is_empty() {
        return Err(PortError::Validation("name must not be empty".to_string()));
    }
    if group.sets < 1 || group.sets > TrainingGroup::MAX_SETS {
        return Err(PortError::Validation(format!(
            "sets must be between 1 and {}",
            TrainingGroup::MAX_SETS
        )));
    }
    if group.set_templates.len() > TrainingGroup::MAX_SETS as usize {
        return Err(PortError::Validation(format!(
            "a group holds at most {} set templates",
            TrainingGroup::MAX_SETS
        )));
    }
    check_count("repsMin", group.reps_min)?;
    check_count("repsMax", group.reps_max)?;
    check_count("restTimeSeconds", Some(group.rest_time_seconds))?;
    if let (Some(min), Some(max)) = (group.reps_min, group.reps_max) {
        if min > max {
            return Err(PortError::Validation(format!(
                "repsMin ({}) must not exceed repsMax ({})",
                min, max
            )));
        }
    }
    for (field, value) in [("weightMin", group.weight_min), ("weightMax", group.weight_max)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(PortError::Validation(format!(
                    "{} must be a non-negative number",
                    field
                )));
            }
        }
    }
    if let (Some(min), Some(max)) = (group.weight_min, group.weight_max) {
        if min > max {
            return Err(PortError::Validation(format!(
                "weightMin ({}) must not exceed weightMax ({})",
                min, max
            )));
        }
    }
    for template in &group.set_templates {
        check_count("reps", template.reps)?;
        check_count("restTimeSeconds", template.rest_time_seconds)?;
        if let Some(w) = template.weight {
            if !w.is_finite() || w < 0.0 {
                return Err(PortError::Validation(format!(
                    "weight of set {} must be a non-negative number",
                    template.set_number
                )));
            }
        }
    }
    Ok(())
}
