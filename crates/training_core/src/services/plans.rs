//! Training plans and their ordered group associations.
//!
//! Association lists are never diffed. Whenever a caller supplies a group list the
//! stored associations are dropped and rebuilt with `order_index` equal to the
//! position in that list, so the result is always `0..len` in caller order.

use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{PlanGroupAssociation, PlanStatus, TrainingGroup, TrainingPlan};
use crate::paging::Page;
use crate::ports::{PlanQuery, PlanStore, PortError, PortResult, TrainingGroupStore};

/// Appended to the name of a duplicated plan.
pub const COPY_SUFFIX: &str = " (Copy)";

#[derive(Debug, Clone, Default)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<PlanStatus>,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: Option<bool>,
    pub is_public: Option<bool>,
    pub group_ids: Vec<Uuid>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PlanStatus>,
    pub plan_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_template: Option<bool>,
    pub is_public: Option<bool>,
}

/// A plan association paired with the group template it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub association: PlanGroupAssociation,
    pub group: TrainingGroup,
}

/// A plan with every association expanded, in `order_index` order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDetails {
    pub plan: TrainingPlan,
    pub entries: Vec<PlanEntry>,
}

pub struct PlanService {
    plans: Arc<dyn PlanStore>,
    groups: Arc<dyn TrainingGroupStore>,
}

impl PlanService {
    pub fn new(plans: Arc<dyn PlanStore>, groups: Arc<dyn TrainingGroupStore>) -> Self {
        Self { plans, groups }
    }

    pub async fn list_plans(&self, user_id: Uuid, query: &PlanQuery) -> PortResult<Page<PlanDetails>> {
        let page = self.plans.list_plans(user_id, query).await?;

        let mut wanted: Vec<Uuid> = page.items.iter().flat_map(|p| p.group_ids()).collect();
        wanted.sort();
        wanted.dedup();
        let groups = self.load_groups(user_id, &wanted).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for plan in &page.items {
            items.push(expand(plan.clone(), &groups)?);
        }
        Ok(Page {
            items,
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        })
    }

    pub async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<PlanDetails> {
        let plan = self.plans.get_plan(user_id, plan_id).await?;
        let groups = self.load_groups(user_id, &plan.group_ids()).await?;
        expand(plan, &groups)
    }

    pub async fn create_plan(&self, user_id: Uuid, input: NewPlan) -> PortResult<PlanDetails> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(PortError::Validation("name must not be empty".to_string()));
        }
        validate_date_range(input.start_date, input.end_date)?;
        let groups = self.require_groups(user_id, &input.group_ids).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let plan = TrainingPlan {
            id,
            user_id,
            name,
            description: input.description,
            status: input.status.unwrap_or(PlanStatus::Draft),
            plan_date: input.plan_date,
            start_date: input.start_date,
            end_date: input.end_date,
            is_template: input.is_template.unwrap_or(false),
            is_public: input.is_public.unwrap_or(false),
            is_active: true,
            associations: build_associations(id, &input.group_ids),
            created_at: now,
            updated_at: now,
        };

        self.plans.insert_plan(&plan).await?;
        info!(plan_id = %plan.id, owner = %user_id, groups = plan.associations.len(), "Training plan created");
        expand(plan, &groups)
    }

    /// Applies `patch` and, when `group_ids` is given, replaces every association.
    pub async fn update_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        patch: PlanPatch,
        group_ids: Option<Vec<Uuid>>,
    ) -> PortResult<PlanDetails> {
        let mut plan = self.plans.get_plan(user_id, plan_id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(PortError::Validation("name must not be empty".to_string()));
            }
            plan.name = name;
        }
        if patch.description.is_some() {
            plan.description = patch.description;
        }
        if let Some(status) = patch.status {
            plan.status = status;
        }
        if patch.plan_date.is_some() {
            plan.plan_date = patch.plan_date;
        }
        if patch.start_date.is_some() {
            plan.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            plan.end_date = patch.end_date;
        }
        if let Some(is_template) = patch.is_template {
            plan.is_template = is_template;
        }
        if let Some(is_public) = patch.is_public {
            plan.is_public = is_public;
        }
        validate_date_range(plan.start_date, plan.end_date)?;

        let replace_associations = group_ids.is_some();
        if let Some(ids) = group_ids {
            self.require_groups(user_id, &ids).await?;
            plan.associations = build_associations(plan.id, &ids);
        }
        plan.updated_at = Utc::now();

        self.plans.update_plan(&plan, replace_associations).await?;
        info!(plan_id = %plan.id, owner = %user_id, replace_associations, "Training plan updated");

        let groups = self.load_groups(user_id, &plan.group_ids()).await?;
        expand(plan, &groups)
    }

    /// Soft-deletes a plan that no session refers to.
    pub async fn delete_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<()> {
        self.plans.get_plan(user_id, plan_id).await?;

        let sessions = self.plans.count_sessions_for_plan(plan_id).await?;
        if sessions > 0 {
            warn!(plan_id = %plan_id, sessions, "Refusing to delete plan with sessions");
            return Err(PortError::Conflict(format!(
                "Training plan {} has associated sessions",
                plan_id
            )));
        }

        self.plans.deactivate_plan(user_id, plan_id).await?;
        info!(plan_id = %plan_id, owner = %user_id, "Training plan deleted");
        Ok(())
    }

    /// Copies a plan into a fresh draft. Association order is carried over unchanged.
    pub async fn duplicate_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<PlanDetails> {
        let source = self.plans.get_plan(user_id, plan_id).await?;
        let copy = duplicate(&source);

        self.plans.insert_plan(&copy).await?;
        info!(source_plan_id = %source.id, plan_id = %copy.id, owner = %user_id, "Training plan duplicated");

        let groups = self.load_groups(user_id, &copy.group_ids()).await?;
        expand(copy, &groups)
    }

    async fn load_groups(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<HashMap<Uuid, TrainingGroup>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let groups = self.groups.get_groups(user_id, ids).await?;
        Ok(groups.into_iter().map(|g| (g.id, g)).collect())
    }

    /// Loads the referenced groups, failing on the first one the caller does not own.
    async fn require_groups(&self, user_id: Uuid, ids: &[Uuid]) -> PortResult<HashMap<Uuid, TrainingGroup>> {
        let mut distinct: Vec<Uuid> = ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();
        distinct.sort();
        let groups = self.load_groups(user_id, &distinct).await?;
        if let Some(missing) = ids.iter().find(|id| !groups.contains_key(*id)) {
            return Err(PortError::NotFound(format!("Training group {} not found", missing)));
        }
        Ok(groups)
    }
}

fn build_associations(plan_id: Uuid, group_ids: &[Uuid]) -> Vec<PlanGroupAssociation> {
    group_ids
        .iter()
        .zip(0u32..)
        .map(|(group_id, order_index)| PlanGroupAssociation {
            id: Uuid::new_v4(),
            plan_id,
            group_id: *group_id,
            order_index,
        })
        .collect()
}

/// Builds the draft copy of `source` without touching storage.
pub fn duplicate(source: &TrainingPlan) -> TrainingPlan {
    let now = Utc::now();
    let id = Uuid::new_v4();
    TrainingPlan {
        id,
        user_id: source.user_id,
        name: format!("{}{}", source.name, COPY_SUFFIX),
        description: source.description.clone(),
        status: PlanStatus::Draft,
        plan_date: None,
        start_date: None,
        end_date: None,
        is_template: false,
        is_public: false,
        is_active: true,
        associations: source
            .associations
            .iter()
            .map(|a| PlanGroupAssociation {
                id: Uuid::new_v4(),
                plan_id: id,
                group_id: a.group_id,
                order_index: a.order_index,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

fn expand(plan: TrainingPlan, groups: &HashMap<Uuid, TrainingGroup>) -> PortResult<PlanDetails> {
    let entries = plan
        .associations
        .iter()
        .map(|association| {
            groups
                .get(&association.group_id)
                .map(|group| PlanEntry {
                    association: association.clone(),
                    group: group.clone(),
                })
                .ok_or_else(|| {
                    PortError::Unexpected(format!(
                        "Plan {} references missing group {}",
                        plan.id, association.group_id
                    ))
                })
        })
        .collect::<PortResult<Vec<_>>>()?;
    Ok(PlanDetails { plan, entries })
}

fn validate_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> PortResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(PortError::Validation(
            "endDate must not be before startDate".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::services::groups::{GroupService, NewTrainingGroup};
    use crate::services::instantiation::InstantiationService;

    struct Fixture {
        store: Arc<InMemoryStore>,
        plans: PlanService,
        owner: Uuid,
        groups: Vec<Uuid>,
    }

    async fn fixture(group_count: usize) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        let group_service = GroupService::new(store.clone(), store.clone());
        let mut groups = Vec::new();
        for i in 0..group_count {
            let group = group_service
                .create_group(
                    owner,
                    NewTrainingGroup {
                        name: format!("Group {}", i),
                        exercise_id: store.add_exercise(),
                        sets: 3,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            groups.push(group.id);
        }
        Fixture {
            plans: PlanService::new(store.clone(), store.clone()),
            store,
            owner,
            groups,
        }
    }

    fn new_plan(name: &str, group_ids: Vec<Uuid>) -> NewPlan {
        NewPlan {
            name: name.to_string(),
            group_ids,
            ..Default::default()
        }
    }

    fn order(details: &PlanDetails) -> Vec<(u32, Uuid)> {
        details
            .entries
            .iter()
            .map(|e| (e.association.order_index, e.group.id))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_positions_in_input_order() {
        let f = fixture(3).await;
        let ids = vec![f.groups[2], f.groups[0], f.groups[1]];
        let plan = f.plans.create_plan(f.owner, new_plan("Push Day", ids.clone())).await.unwrap();

        assert_eq!(plan.plan.status, PlanStatus::Draft);
        assert_eq!(order(&plan), vec![(0, ids[0]), (1, ids[1]), (2, ids[2])]);
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let f = fixture(0).await;
        let err = f.plans.create_plan(f.owner, new_plan("  ", vec![])).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_groups_of_other_users() {
        let f = fixture(1).await;
        let err = f
            .plans
            .create_plan(Uuid::new_v4(), new_plan("Mine", f.groups.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_replaces_associations_exactly() {
        let f = fixture(3).await;
        let (g1, g2, g3) = (f.groups[0], f.groups[1], f.groups[2]);
        let plan = f.plans.create_plan(f.owner, new_plan("Legs", vec![g1, g2, g3])).await.unwrap();

        let updated = f
            .plans
            .update_plan(f.owner, plan.plan.id, PlanPatch::default(), Some(vec![g3, g1]))
            .await
            .unwrap();
        assert_eq!(order(&updated), vec![(0, g3), (1, g1)]);

        let reloaded = f.plans.get_plan(f.owner, plan.plan.id).await.unwrap();
        assert_eq!(order(&reloaded), vec![(0, g3), (1, g1)]);
        assert_eq!(reloaded.plan.associations.len(), 2);
    }

    #[tokio::test]
    async fn update_with_empty_list_removes_all_associations() {
        let f = fixture(2).await;
        let plan = f.plans.create_plan(f.owner, new_plan("Arms", f.groups.clone())).await.unwrap();

        let updated = f
            .plans
            .update_plan(f.owner, plan.plan.id, PlanPatch::default(), Some(vec![]))
            .await
            .unwrap();
        assert!(updated.entries.is_empty());
        assert!(f.plans.get_plan(f.owner, plan.plan.id).await.unwrap().plan.associations.is_empty());
    }

    #[tokio::test]
    async fn update_without_group_list_keeps_associations() {
        let f = fixture(2).await;
        let plan = f.plans.create_plan(f.owner, new_plan("Back", f.groups.clone())).await.unwrap();

        let updated = f
            .plans
            .update_plan(
                f.owner,
                plan.plan.id,
                PlanPatch {
                    name: Some("Back & Biceps".to_string()),
                    status: Some(PlanStatus::Active),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.plan.name, "Back & Biceps");
        assert_eq!(updated.plan.status, PlanStatus::Active);
        assert_eq!(updated.plan.associations, plan.plan.associations);
    }

    #[tokio::test]
    async fn update_unknown_plan_is_not_found() {
        let f = fixture(0).await;
        let err = f
            .plans
            .update_plan(f.owner, Uuid::new_v4(), PlanPatch::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_preserves_shape_and_resets_flags() {
        let f = fixture(3).await;
        let mut input = new_plan("Push Day", f.groups.clone());
        input.description = Some("Chest and triceps".to_string());
        input.status = Some(PlanStatus::Active);
        input.is_template = Some(true);
        input.is_public = Some(true);
        input.plan_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        let source = f.plans.create_plan(f.owner, input).await.unwrap();

        let copy = f.plans.duplicate_plan(f.owner, source.plan.id).await.unwrap();

        assert_ne!(copy.plan.id, source.plan.id);
        assert_eq!(copy.plan.name, "Push Day (Copy)");
        assert_eq!(copy.plan.description.as_deref(), Some("Chest and triceps"));
        assert_eq!(copy.plan.status, PlanStatus::Draft);
        assert!(!copy.plan.is_template);
        assert!(!copy.plan.is_public);
        assert_eq!(copy.plan.plan_date, None);
        assert_eq!(order(&copy), order(&source));
        assert!(copy.plan.associations.iter().all(|a| a.plan_id == copy.plan.id));
    }

    #[tokio::test]
    async fn delete_hides_plan_from_reads() {
        let f = fixture(1).await;
        let plan = f.plans.create_plan(f.owner, new_plan("Core", f.groups.clone())).await.unwrap();

        f.plans.delete_plan(f.owner, plan.plan.id).await.unwrap();

        assert!(matches!(
            f.plans.get_plan(f.owner, plan.plan.id).await,
            Err(PortError::NotFound(_))
        ));
        let page = f.plans.list_plans(f.owner, &PlanQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(matches!(
            f.plans.duplicate_plan(f.owner, plan.plan.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_with_sessions_is_a_conflict() {
        let f = fixture(1).await;
        let plan = f.plans.create_plan(f.owner, new_plan("Full Body", f.groups.clone())).await.unwrap();
        let engine = InstantiationService::new(f.store.clone(), f.store.clone(), f.store.clone());
        engine.start_plan(f.owner, plan.plan.id).await.unwrap();

        let err = f.plans.delete_plan(f.owner, plan.plan.id).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert!(f.plans.get_plan(f.owner, plan.plan.id).await.unwrap().plan.is_active);
    }

    #[tokio::test]
    async fn list_filters_by_search_and_status() {
        let f = fixture(0).await;
        f.plans.create_plan(f.owner, new_plan("Push Day", vec![])).await.unwrap();
        let mut pull = new_plan("Pull Day", vec![]);
        pull.status = Some(PlanStatus::Active);
        f.plans.create_plan(f.owner, pull).await.unwrap();
        f.plans.create_plan(Uuid::new_v4(), new_plan("Push Someone Else", vec![])).await.unwrap();

        let push = f
            .plans
            .list_plans(
                f.owner,
                &PlanQuery {
                    search: Some("push".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(push.total, 1);
        assert_eq!(push.items[0].plan.name, "Push Day");

        let active = f
            .plans
            .list_plans(
                f.owner,
                &PlanQuery {
                    status: Some(PlanStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(active.total, 1);
        assert_eq!(active.items[0].plan.name, "Pull Day");
    }
}
