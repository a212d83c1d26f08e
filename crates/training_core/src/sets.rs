//! crates/training_core/src/sets.rs
//!
//! The default-set-generation rule: how a training group template turns into the
//! set rows of a freshly started exercise record.
//!
//! A group with explicit set templates is copied as-is. Otherwise `sets` rows are
//! generated from the bottom of the configured rep and weight ranges. The rule is
//! deterministic; nothing here interpolates inside a range.

use uuid::Uuid;

use crate::domain::{SetRecord, TrainingGroup};

/// A set row as planned by a template, before it belongs to any record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSet {
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rest_time_seconds: Option<u32>,
    pub notes: Option<String>,
}

impl PlannedSet {
    /// Materializes the planned set as a not-yet-completed row of `record_id`.
    pub fn into_record(self, record_id: Uuid) -> SetRecord {
        SetRecord {
            id: Uuid::new_v4(),
            record_id,
            set_number: self.set_number,
            reps: self.reps,
            weight: self.weight,
            rest_time_seconds: self.rest_time_seconds,
            is_completed: false,
            notes: self.notes,
        }
    }
}

/// Returns the set rows a session should start with for `group`.
pub fn planned_sets(group: &TrainingGroup) -> Vec<PlannedSet> {
    if !group.set_templates.is_empty() {
        let mut templates: Vec<_> = group.set_templates.iter().collect();
        templates.sort_by_key(|t| t.set_number);
        return templates
            .into_iter()
            .map(|t| PlannedSet {
                set_number: t.set_number,
                reps: t.reps,
                weight: t.weight,
                rest_time_seconds: t.rest_time_seconds,
                notes: t.notes.clone(),
            })
            .collect();
    }

    (1..=group.sets)
        .map(|set_number| PlannedSet {
            set_number,
            reps: group.reps_min,
            weight: group.weight_min,
            rest_time_seconds: Some(group.rest_time_seconds),
            notes: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SetTemplate;
    use chrono::Utc;

    fn group(sets: u32) -> TrainingGroup {
        let now = Utc::now();
        TrainingGroup {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Bench".to_string(),
            exercise_id: Uuid::new_v4(),
            sets,
            reps_min: Some(8),
            reps_max: Some(12),
            weight_min: Some(50.0),
            weight_max: Some(60.0),
            rest_time_seconds: 90,
            notes: None,
            set_templates: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn template(group_id: Uuid, set_number: u32, reps: u32, weight: f64) -> SetTemplate {
        SetTemplate {
            id: Uuid::new_v4(),
            group_id,
            set_number,
            reps: Some(reps),
            weight: Some(weight),
            rest_time_seconds: Some(120),
            notes: Some(format!("set {}", set_number)),
        }
    }

    #[test]
    fn range_fallback_uses_minimums() {
        let sets = planned_sets(&group(3));
        assert_eq!(sets.len(), 3);
        for (i, set) in sets.iter().enumerate() {
            assert_eq!(set.set_number, i as u32 + 1);
            assert_eq!(set.reps, Some(8));
            assert_eq!(set.weight, Some(50.0));
            assert_eq!(set.rest_time_seconds, Some(90));
            assert_eq!(set.notes, None);
        }
    }

    #[test]
    fn range_fallback_leaves_missing_bounds_empty() {
        let mut g = group(2);
        g.reps_min = None;
        g.weight_min = None;
        let sets = planned_sets(&g);
        assert!(sets.iter().all(|s| s.reps.is_none() && s.weight.is_none()));
    }

    #[test]
    fn explicit_templates_win_even_when_count_differs() {
        let mut g = group(5);
        g.set_templates = vec![template(g.id, 1, 5, 100.0), template(g.id, 2, 5, 105.0)];
        let sets = planned_sets(&g);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].weight, Some(100.0));
        assert_eq!(sets[1].weight, Some(105.0));
        assert_eq!(sets[1].rest_time_seconds, Some(120));
        assert_eq!(sets[1].notes.as_deref(), Some("set 2"));
    }

    #[test]
    fn explicit_templates_follow_set_number_order() {
        let mut g = group(1);
        g.set_templates = vec![template(g.id, 2, 3, 80.0), template(g.id, 1, 5, 70.0)];
        let numbers: Vec<_> = planned_sets(&g).iter().map(|s| s.set_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn materialized_sets_start_incomplete() {
        let record_id = Uuid::new_v4();
        let rows: Vec<_> = planned_sets(&group(2))
            .into_iter()
            .map(|s| s.into_record(record_id))
            .collect();
        assert!(rows.iter().all(|r| !r.is_completed && r.record_id == record_id));
        assert_ne!(rows[0].id, rows[1].id);
    }
}
