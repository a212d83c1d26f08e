//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! store ports from the `core` crate. It handles all interactions with the
//! PostgreSQL database using `sqlx`.
//!
//! Every write that touches more than one row runs inside a single transaction, so
//! readers never observe a half-written aggregate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use training_core::domain::{
    ExerciseRecord, ExerciseSession, PlanGroupAssociation, PlanStatus, SessionStatus, SetRecord,
    SetTemplate, TrainingGroup, TrainingPlan,
};
use training_core::paging::{Page, PageRequest};
use training_core::ports::{
    ExerciseCatalog, GroupQuery, GroupSortField, PlanQuery, PlanStore, PortError, PortResult,
    SessionQuery, SessionStore, TrainingGroupStore,
};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every store port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn begin(&self) -> PortResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))
    }
}

/// Maps unique-constraint violations to `Conflict` and everything else to `Unexpected`.
fn db_error(context: &str, e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{}: {}", context, db.message()))
        }
        _ => PortError::Unexpected(format!("{}: {}", context, e)),
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> PortResult<()> {
    tx.commit()
        .await
        .map_err(|e| db_error("Failed to commit transaction", e))
}

/// Counts are `u32` in the domain and `INTEGER` in the schema.
fn to_i32(field: &str, value: u32) -> PortResult<i32> {
    i32::try_from(value)
        .map_err(|_| PortError::Validation(format!("{} is out of range: {}", field, value)))
}

fn opt_i32(field: &str, value: Option<u32>) -> PortResult<Option<i32>> {
    value.map(|v| to_i32(field, v)).transpose()
}

fn opt_u32(value: Option<i32>) -> Option<u32> {
    value.map(|v| v as u32)
}

fn limit_offset(page: PageRequest) -> (i64, i64) {
    (i64::from(page.limit), i64::try_from(page.offset()).unwrap_or(i64::MAX))
}

/// Escapes LIKE wildcards so a search term only matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct GroupRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    exercise_id: Uuid,
    sets: i32,
    reps_min: Option<i32>,
    reps_max: Option<i32>,
    weight_min: Option<f64>,
    weight_max: Option<f64>,
    rest_time_seconds: i32,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl GroupRecord {
    fn to_domain(self, set_templates: Vec<SetTemplate>) -> TrainingGroup {
        TrainingGroup {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            exercise_id: self.exercise_id,
            sets: self.sets as u32,
            reps_min: opt_u32(self.reps_min),
            reps_max: opt_u32(self.reps_max),
            weight_min: self.weight_min,
            weight_max: self.weight_max,
            rest_time_seconds: self.rest_time_seconds as u32,
            notes: self.notes,
            set_templates,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SetTemplateRecord {
    id: Uuid,
    group_id: Uuid,
    set_number: i32,
    reps: Option<i32>,
    weight: Option<f64>,
    rest_time_seconds: Option<i32>,
    notes: Option<String>,
}
impl SetTemplateRecord {
    fn to_domain(self) -> SetTemplate {
        SetTemplate {
            id: self.id,
            group_id: self.group_id,
            set_number: self.set_number as u32,
            reps: opt_u32(self.reps),
            weight: self.weight,
            rest_time_seconds: opt_u32(self.rest_time_seconds),
            notes: self.notes,
        }
    }
}

#[derive(FromRow)]
struct PlanRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    plan_date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    is_template: bool,
    is_public: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl PlanRecord {
    fn to_domain(self, associations: Vec<PlanGroupAssociation>) -> PortResult<TrainingPlan> {
        let status = self
            .status
            .parse::<PlanStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(TrainingPlan {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            status,
            plan_date: self.plan_date,
            start_date: self.start_date,
            end_date: self.end_date,
            is_template: self.is_template,
            is_public: self.is_public,
            is_active: self.is_active,
            associations,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AssociationRecord {
    id: Uuid,
    plan_id: Uuid,
    group_id: Uuid,
    order_index: i32,
}
impl AssociationRecord {
    fn to_domain(self) -> PlanGroupAssociation {
        PlanGroupAssociation {
            id: self.id,
            plan_id: self.plan_id,
            group_id: self.group_id,
            order_index: self.order_index as u32,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    plan_id: Option<Uuid>,
    name: String,
    session_date: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    total_duration_minutes: Option<i32>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self, records: Vec<ExerciseRecord>) -> PortResult<ExerciseSession> {
        let status = self
            .status
            .parse::<SessionStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(ExerciseSession {
            id: self.id,
            user_id: self.user_id,
            plan_id: self.plan_id,
            name: self.name,
            session_date: self.session_date,
            start_time: self.start_time,
            end_time: self.end_time,
            total_duration_minutes: opt_u32(self.total_duration_minutes),
            status,
            notes: self.notes,
            records,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ExerciseRecordRow {
    id: Uuid,
    session_id: Uuid,
    group_id: Option<Uuid>,
    exercise_id: Uuid,
    order_index: i32,
    notes: Option<String>,
}
impl ExerciseRecordRow {
    fn to_domain(self, sets: Vec<SetRecord>) -> ExerciseRecord {
        ExerciseRecord {
            id: self.id,
            session_id: self.session_id,
            group_id: self.group_id,
            exercise_id: self.exercise_id,
            order_index: self.order_index as u32,
            notes: self.notes,
            sets,
        }
    }
}

#[derive(FromRow)]
struct SetRecordRow {
    id: Uuid,
    record_id: Uuid,
    set_number: i32,
    reps: Option<i32>,
    weight: Option<f64>,
    rest_time_seconds: Option<i32>,
    is_completed: bool,
    notes: Option<String>,
}
impl SetRecordRow {
    fn to_domain(self) -> SetRecord {
        SetRecord {
            id: self.id,
            record_id: self.record_id,
            set_number: self.set_number as u32,
            reps: opt_u32(self.reps),
            weight: self.weight,
            rest_time_seconds: opt_u32(self.rest_time_seconds),
            is_completed: self.is_completed,
            notes: self.notes,
        }
    }
}

const GROUP_COLUMNS: &str = "id, user_id, name, exercise_id, sets, reps_min, reps_max, weight_min, \
     weight_max, rest_time_seconds, notes, created_at, updated_at";

const PLAN_COLUMNS: &str = "id, user_id, name, description, status, plan_date, start_date, end_date, \
     is_template, is_public, is_active, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, plan_id, name, session_date, start_time, end_time, \
     total_duration_minutes, status, notes, created_at, updated_at";

//=========================================================================================
// Child Loading and Writing Helpers
//=========================================================================================

impl DbAdapter {
    async fn attach_set_templates(&self, rows: Vec<GroupRecord>) -> PortResult<Vec<TrainingGroup>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let templates = sqlx::query_as::<_, SetTemplateRecord>(
            "SELECT id, group_id, set_number, reps, weight, rest_time_seconds, notes \
             FROM training_group_set_templates WHERE group_id = ANY($1) \
             ORDER BY group_id, set_number",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load set templates", e))?;

        let mut by_group: HashMap<Uuid, Vec<SetTemplate>> = HashMap::new();
        for t in templates {
            by_group.entry(t.group_id).or_default().push(t.to_domain());
        }
        Ok(rows
            .into_iter()
            .map(|r| {
                let templates = by_group.remove(&r.id).unwrap_or_default();
                r.to_domain(templates)
            })
            .collect())
    }

    async fn attach_associations(&self, rows: Vec<PlanRecord>) -> PortResult<Vec<TrainingPlan>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let associations = sqlx::query_as::<_, AssociationRecord>(
            "SELECT id, plan_id, group_id, order_index FROM training_plan_groups \
             WHERE plan_id = ANY($1) ORDER BY plan_id, order_index",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load plan groups", e))?;

        let mut by_plan: HashMap<Uuid, Vec<PlanGroupAssociation>> = HashMap::new();
        for a in associations {
            by_plan.entry(a.plan_id).or_default().push(a.to_domain());
        }
        rows.into_iter()
            .map(|r| {
                let associations = by_plan.remove(&r.id).unwrap_or_default();
                r.to_domain(associations)
            })
            .collect()
    }

    async fn attach_records(&self, rows: Vec<SessionRecord>) -> PortResult<Vec<ExerciseSession>> {
        let session_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let records = sqlx::query_as::<_, ExerciseRecordRow>(
            "SELECT id, session_id, group_id, exercise_id, order_index, notes \
             FROM exercise_records WHERE session_id = ANY($1) ORDER BY session_id, order_index",
        )
        .bind(&session_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load exercise records", e))?;

        let record_ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let sets = sqlx::query_as::<_, SetRecordRow>(
            "SELECT id, record_id, set_number, reps, weight, rest_time_seconds, is_completed, notes \
             FROM exercise_set_records WHERE record_id = ANY($1) ORDER BY record_id, set_number",
        )
        .bind(&record_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load set records", e))?;

        let mut sets_by_record: HashMap<Uuid, Vec<SetRecord>> = HashMap::new();
        for s in sets {
            sets_by_record.entry(s.record_id).or_default().push(s.to_domain());
        }
        let mut records_by_session: HashMap<Uuid, Vec<ExerciseRecord>> = HashMap::new();
        for r in records {
            let sets = sets_by_record.remove(&r.id).unwrap_or_default();
            records_by_session
                .entry(r.session_id)
                .or_default()
                .push(r.to_domain(sets));
        }
        rows.into_iter()
            .map(|r| {
                let records = records_by_session.remove(&r.id).unwrap_or_default();
                r.to_domain(records)
            })
            .collect()
    }
}

async fn insert_set_templates(
    tx: &mut Transaction<'_, Postgres>,
    templates: &[SetTemplate],
) -> PortResult<()> {
    for t in templates {
        sqlx::query(
            "INSERT INTO training_group_set_templates \
             (id, group_id, set_number, reps, weight, rest_time_seconds, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(t.id)
        .bind(t.group_id)
        .bind(to_i32("set_number", t.set_number)?)
        .bind(opt_i32("reps", t.reps)?)
        .bind(t.weight)
        .bind(opt_i32("rest_time_seconds", t.rest_time_seconds)?)
        .bind(&t.notes)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to insert set template", e))?;
    }
    Ok(())
}

async fn insert_associations(
    tx: &mut Transaction<'_, Postgres>,
    associations: &[PlanGroupAssociation],
) -> PortResult<()> {
    for a in associations {
        sqlx::query(
            "INSERT INTO training_plan_groups (id, plan_id, group_id, order_index) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(a.id)
        .bind(a.plan_id)
        .bind(a.group_id)
        .bind(to_i32("order_index", a.order_index)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to insert plan group", e))?;
    }
    Ok(())
}

async fn insert_record_tree(
    tx: &mut Transaction<'_, Postgres>,
    record: &ExerciseRecord,
) -> PortResult<()> {
    sqlx::query(
        "INSERT INTO exercise_records (id, session_id, group_id, exercise_id, order_index, notes) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(record.id)
    .bind(record.session_id)
    .bind(record.group_id)
    .bind(record.exercise_id)
    .bind(to_i32("order_index", record.order_index)?)
    .bind(&record.notes)
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("Failed to insert exercise record", e))?;

    for set in &record.sets {
        sqlx::query(
            "INSERT INTO exercise_set_records \
             (id, record_id, set_number, reps, weight, rest_time_seconds, is_completed, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(set.id)
        .bind(set.record_id)
        .bind(to_i32("set_number", set.set_number)?)
        .bind(opt_i32("reps", set.reps)?)
        .bind(set.weight)
        .bind(opt_i32("rest_time_seconds", set.rest_time_seconds)?)
        .bind(set.is_completed)
        .bind(&set.notes)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to insert set record", e))?;
    }
    Ok(())
}

//=========================================================================================
// `ExerciseCatalog` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExerciseCatalog for DbAdapter {
    async fn exercise_exists(&self, exercise_id: Uuid) -> PortResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM exercises WHERE id = $1)")
                .bind(exercise_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to look up exercise", e))?;
        Ok(exists)
    }
}

//=========================================================================================
// `TrainingGroupStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrainingGroupStore for DbAdapter {
    async fn list_groups(&self, user_id: Uuid, query: &GroupQuery) -> PortResult<Page<TrainingGroup>> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM training_groups WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to count training groups", e))?;

        let column = match query.sort_by {
            GroupSortField::Name => "lower(name)",
            GroupSortField::CreatedAt => "created_at",
            GroupSortField::UpdatedAt => "updated_at",
        };
        let sql = format!(
            "SELECT {} FROM training_groups WHERE user_id = $1 ORDER BY {} {}, id LIMIT $2 OFFSET $3",
            GROUP_COLUMNS,
            column,
            query.order.as_sql()
        );
        let (limit, offset) = limit_offset(query.page);
        let rows = sqlx::query_as::<_, GroupRecord>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list training groups", e))?;

        let groups = self.attach_set_templates(rows).await?;
        Ok(Page::new(groups, query.page, total as u64))
    }

    async fn get_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<TrainingGroup> {
        let row = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {} FROM training_groups WHERE id = $1 AND user_id = $2",
            GROUP_COLUMNS
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch training group", e))?
        .ok_or_else(|| PortError::NotFound(format!("Training group {} not found", group_id)))?;

        let mut groups = self.attach_set_templates(vec![row]).await?;
        groups
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Training group {} not found", group_id)))
    }

    async fn get_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> PortResult<Vec<TrainingGroup>> {
        let rows = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {} FROM training_groups WHERE user_id = $1 AND id = ANY($2)",
            GROUP_COLUMNS
        ))
        .bind(user_id)
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch training groups", e))?;
        self.attach_set_templates(rows).await
    }

    async fn insert_group(&self, group: &TrainingGroup) -> PortResult<()> {
        let mut tx = self.begin().await?;

        sqlx::query(
            "INSERT INTO training_groups (id, user_id, name, exercise_id, sets, reps_min, reps_max, \
             weight_min, weight_max, rest_time_seconds, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(group.id)
        .bind(group.user_id)
        .bind(&group.name)
        .bind(group.exercise_id)
        .bind(to_i32("sets", group.sets)?)
        .bind(opt_i32("reps_min", group.reps_min)?)
        .bind(opt_i32("reps_max", group.reps_max)?)
        .bind(group.weight_min)
        .bind(group.weight_max)
        .bind(to_i32("rest_time_seconds", group.rest_time_seconds)?)
        .bind(&group.notes)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert training group", e))?;

        insert_set_templates(&mut tx, &group.set_templates).await?;
        commit(tx).await
    }

    async fn update_group(&self, group: &TrainingGroup, replace_set_templates: bool) -> PortResult<()> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "UPDATE training_groups SET name = $3, exercise_id = $4, sets = $5, reps_min = $6, \
             reps_max = $7, weight_min = $8, weight_max = $9, rest_time_seconds = $10, notes = $11, \
             updated_at = $12 WHERE id = $1 AND user_id = $2",
        )
        .bind(group.id)
        .bind(group.user_id)
        .bind(&group.name)
        .bind(group.exercise_id)
        .bind(to_i32("sets", group.sets)?)
        .bind(opt_i32("reps_min", group.reps_min)?)
        .bind(opt_i32("reps_max", group.reps_max)?)
        .bind(group.weight_min)
        .bind(group.weight_max)
        .bind(to_i32("rest_time_seconds", group.rest_time_seconds)?)
        .bind(&group.notes)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update training group", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Training group {} not found", group.id)));
        }

        if replace_set_templates {
            sqlx::query("DELETE FROM training_group_set_templates WHERE group_id = $1")
                .bind(group.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to clear set templates", e))?;
            insert_set_templates(&mut tx, &group.set_templates).await?;
        }
        commit(tx).await
    }

    async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM training_groups WHERE id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete training group", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Training group {} not found", group_id)));
        }
        Ok(())
    }

    async fn count_active_plan_references(&self, user_id: Uuid, group_id: Uuid) -> PortResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT p.id) FROM training_plan_groups a \
             JOIN training_plans p ON p.id = a.plan_id \
             WHERE a.group_id = $1 AND p.user_id = $2 AND p.is_active",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count plan references", e))?;
        Ok(count as u64)
    }
}

//=========================================================================================
// `PlanStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanStore for DbAdapter {
    async fn list_plans(&self, user_id: Uuid, query: &PlanQuery) -> PortResult<Page<TrainingPlan>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let status = query.status.map(|s| s.as_str());
        let filter = "user_id = $1 AND is_active \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::text IS NULL OR name ILIKE $3 OR description ILIKE $3)";

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM training_plans WHERE {}", filter))
                .bind(user_id)
                .bind(status)
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to count training plans", e))?;

        let (limit, offset) = limit_offset(query.page);
        let rows = sqlx::query_as::<_, PlanRecord>(&format!(
            "SELECT {} FROM training_plans WHERE {} ORDER BY created_at DESC, id LIMIT $4 OFFSET $5",
            PLAN_COLUMNS, filter
        ))
        .bind(user_id)
        .bind(status)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list training plans", e))?;

        let plans = self.attach_associations(rows).await?;
        Ok(Page::new(plans, query.page, total as u64))
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<TrainingPlan> {
        let row = sqlx::query_as::<_, PlanRecord>(&format!(
            "SELECT {} FROM training_plans WHERE id = $1 AND user_id = $2 AND is_active",
            PLAN_COLUMNS
        ))
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch training plan", e))?
        .ok_or_else(|| PortError::NotFound(format!("Training plan {} not found", plan_id)))?;

        let mut plans = self.attach_associations(vec![row]).await?;
        plans
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Training plan {} not found", plan_id)))
    }

    async fn insert_plan(&self, plan: &TrainingPlan) -> PortResult<()> {
        let mut tx = self.begin().await?;

        sqlx::query(
            "INSERT INTO training_plans (id, user_id, name, description, status, plan_date, \
             start_date, end_date, is_template, is_public, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.status.as_str())
        .bind(plan.plan_date)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.is_template)
        .bind(plan.is_public)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert training plan", e))?;

        insert_associations(&mut tx, &plan.associations).await?;
        commit(tx).await
    }

    async fn update_plan(&self, plan: &TrainingPlan, replace_associations: bool) -> PortResult<()> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "UPDATE training_plans SET name = $3, description = $4, status = $5, plan_date = $6, \
             start_date = $7, end_date = $8, is_template = $9, is_public = $10, updated_at = $11 \
             WHERE id = $1 AND user_id = $2 AND is_active",
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.status.as_str())
        .bind(plan.plan_date)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.is_template)
        .bind(plan.is_public)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update training plan", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Training plan {} not found", plan.id)));
        }

        if replace_associations {
            sqlx::query("DELETE FROM training_plan_groups WHERE plan_id = $1")
                .bind(plan.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to clear plan groups", e))?;
            insert_associations(&mut tx, &plan.associations).await?;
        }
        commit(tx).await
    }

    async fn deactivate_plan(&self, user_id: Uuid, plan_id: Uuid) -> PortResult<()> {
        let mut tx = self.begin().await?;

        // Conflicts with the FOR SHARE lock `insert_session` takes on the plan row, so the
        // session count below sees every session started from this plan.
        let locked = sqlx::query(
            "SELECT id FROM training_plans WHERE id = $1 AND user_id = $2 AND is_active FOR UPDATE",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock training plan", e))?;
        if locked.is_none() {
            return Err(PortError::NotFound(format!("Training plan {} not found", plan_id)));
        }

        let (sessions,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM exercise_sessions WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to count plan sessions", e))?;
        if sessions > 0 {
            return Err(PortError::Conflict(format!(
                "Training plan {} has associated sessions",
                plan_id
            )));
        }

        sqlx::query("UPDATE training_plans SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to delete training plan", e))?;
        commit(tx).await
    }

    async fn count_sessions_for_plan(&self, plan_id: Uuid) -> PortResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM exercise_sessions WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to count plan sessions", e))?;
        Ok(count as u64)
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn list_sessions(
        &self,
        user_id: Uuid,
        query: &SessionQuery,
    ) -> PortResult<Page<ExerciseSession>> {
        let status = query.status.map(|s| s.as_str());
        let filter = "user_id = $1 \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::uuid IS NULL OR plan_id = $3)";

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM exercise_sessions WHERE {}", filter))
                .bind(user_id)
                .bind(status)
                .bind(query.plan_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to count sessions", e))?;

        let (limit, offset) = limit_offset(query.page);
        let order = query.order.as_sql();
        let rows = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM exercise_sessions WHERE {} \
             ORDER BY session_date {}, created_at {}, id LIMIT $4 OFFSET $5",
            SESSION_COLUMNS, filter, order, order
        ))
        .bind(user_id)
        .bind(status)
        .bind(query.plan_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list sessions", e))?;

        let sessions = self.attach_records(rows).await?;
        Ok(Page::new(sessions, query.page, total as u64))
    }

    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<ExerciseSession> {
        let row = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM exercise_sessions WHERE id = $1 AND user_id = $2",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch session", e))?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;

        let mut sessions = self.attach_records(vec![row]).await?;
        sessions
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn insert_session(&self, session: &ExerciseSession) -> PortResult<()> {
        let mut tx = self.begin().await?;

        // Holds off a concurrent `deactivate_plan` until this session is committed.
        if let Some(plan_id) = session.plan_id {
            let plan = sqlx::query(
                "SELECT id FROM training_plans WHERE id = $1 AND user_id = $2 AND is_active FOR SHARE",
            )
            .bind(plan_id)
            .bind(session.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock training plan", e))?;
            if plan.is_none() {
                return Err(PortError::NotFound(format!("Training plan {} not found", plan_id)));
            }
        }

        sqlx::query(
            "INSERT INTO exercise_sessions (id, user_id, plan_id, name, session_date, start_time, \
             end_time, total_duration_minutes, status, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.plan_id)
        .bind(&session.name)
        .bind(session.session_date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(opt_i32("total_duration_minutes", session.total_duration_minutes)?)
        .bind(session.status.as_str())
        .bind(&session.notes)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert session", e))?;

        for record in &session.records {
            insert_record_tree(&mut tx, record).await?;
        }
        commit(tx).await
    }

    async fn update_session(&self, session: &ExerciseSession) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE exercise_sessions SET name = $3, session_date = $4, start_time = $5, \
             end_time = $6, total_duration_minutes = $7, status = $8, notes = $9, updated_at = $10 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.name)
        .bind(session.session_date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(opt_i32("total_duration_minutes", session.total_duration_minutes)?)
        .bind(session.status.as_str())
        .bind(&session.notes)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update session", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session.id)));
        }
        Ok(())
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        // Records and set rows follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM exercise_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete session", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session_id)));
        }
        Ok(())
    }

    async fn insert_record(&self, user_id: Uuid, record: &ExerciseRecord) -> PortResult<()> {
        let mut tx = self.begin().await?;

        let owned = sqlx::query("SELECT id FROM exercise_sessions WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(record.session_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock session", e))?;
        if owned.is_none() {
            return Err(PortError::NotFound(format!("Session {} not found", record.session_id)));
        }
        if let Some(group_id) = record.group_id {
            let group = sqlx::query("SELECT id FROM training_groups WHERE id = $1 AND user_id = $2 FOR SHARE")
                .bind(group_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to lock training group", e))?;
            if group.is_none() {
                return Err(PortError::NotFound(format!("Training group {} not found", group_id)));
            }
        }

        insert_record_tree(&mut tx, record).await?;
        sqlx::query("UPDATE exercise_sessions SET updated_at = now() WHERE id = $1")
            .bind(record.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to touch session", e))?;
        commit(tx).await
    }

    async fn update_set_record(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        set: &SetRecord,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE exercise_set_records s SET reps = $1, weight = $2, rest_time_seconds = $3, \
             is_completed = $4, notes = $5 \
             FROM exercise_records r JOIN exercise_sessions es ON es.id = r.session_id \
             WHERE s.id = $6 AND s.record_id = $7 AND r.id = s.record_id \
             AND es.id = $8 AND es.user_id = $9",
        )
        .bind(opt_i32("reps", set.reps)?)
        .bind(set.weight)
        .bind(opt_i32("rest_time_seconds", set.rest_time_seconds)?)
        .bind(set.is_completed)
        .bind(&set.notes)
        .bind(set.id)
        .bind(set.record_id)
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update set record", e))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Set {} not found", set.id)));
        }
        Ok(())
    }
}
