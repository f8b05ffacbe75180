pub mod export;
pub mod materialize;
pub mod segment;
pub mod store;
pub mod taskref;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::urls::ApiUrls;
use crate::shared::schema::{
    chantiers, ouvriers_internes, planning_task_ouvriers, planning_task_sous_traitants,
    planning_tasks, sous_traitants,
};
use crate::shared::state::AppState;

use materialize::TaskPlan;
use segment::DaySegment;
use store::{BatchOutcome, NewTaskData, RemoveDayOutcome, StoreError, TaskChanges};
use taskref::TaskRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Prevu,
    EnCours,
    Termine,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Prevu => "prevu",
            TaskStatus::EnCours => "en_cours",
            TaskStatus::Termine => "termine",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "prevu" => Some(TaskStatus::Prevu),
            "en_cours" => Some(TaskStatus::EnCours),
            "termine" => Some(TaskStatus::Termine),
            _ => None,
        }
    }
}

// Database models - match schema exactly
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = planning_tasks)]
pub struct PlanningTask {
    pub id: Uuid,
    pub titre: String,
    pub description: Option<String>,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub statut: String,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = planning_task_ouvriers)]
pub struct TaskOuvrier {
    pub task_id: Uuid,
    pub ouvrier_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = planning_task_sous_traitants)]
pub struct TaskSousTraitant {
    pub task_id: Uuid,
    pub sous_traitant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = chantiers)]
pub struct Chantier {
    pub id: Uuid,
    pub nom: String,
    pub adresse: Option<String>,
    pub couleur: String,
    pub statut: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = ouvriers_internes)]
pub struct OuvrierInterne {
    pub id: Uuid,
    pub nom: String,
    pub prenom: String,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = sous_traitants)]
pub struct SousTraitant {
    pub id: Uuid,
    pub nom: String,
    pub specialite: Option<String>,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

// API request/response models
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub titre: String,
    pub description: Option<String>,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub statut: Option<TaskStatus>,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub ouvrier_ids: Option<Vec<Uuid>>,
    pub sous_traitant_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub titre: Option<String>,
    pub description: Option<String>,
    pub date_debut: Option<DateTime<Utc>>,
    pub date_fin: Option<DateTime<Utc>>,
    pub statut: Option<TaskStatus>,
    pub chantier_id: Option<Option<Uuid>>,
    pub sav_ticket_id: Option<Option<Uuid>>,
    pub ouvrier_ids: Option<Vec<Uuid>>,
    pub sous_traitant_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct PatchTaskRequest {
    pub action: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub statut: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub titre: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub segment: DaySegment,
    pub duration_days: u32,
    pub statut: Option<TaskStatus>,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub ouvrier_ids: Option<Vec<Uuid>>,
    pub sous_traitant_ids: Option<Vec<Uuid>>,
}

impl BatchCreateRequest {
    fn into_plan(self) -> TaskPlan {
        TaskPlan {
            titre: self.titre,
            description: self.description,
            anchor: self.date,
            segment: self.segment,
            duration_days: self.duration_days,
            statut: self.statut.unwrap_or(TaskStatus::Prevu),
            chantier_id: self.chantier_id,
            sav_ticket_id: self.sav_ticket_id,
            ouvrier_ids: self.ouvrier_ids.unwrap_or_default(),
            sous_traitant_ids: self.sous_traitant_ids.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub first_task_id: Option<Uuid>,
    pub created: usize,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub titre: String,
    pub description: Option<String>,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub statut: TaskStatus,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub ouvrier_ids: Vec<Uuid>,
    pub sous_traitant_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    fn from_task(task: PlanningTask, ouvrier_ids: Vec<Uuid>, sous_traitant_ids: Vec<Uuid>) -> Self {
        TaskResponse {
            id: task.id,
            titre: task.titre,
            description: task.description,
            date_debut: task.date_debut,
            date_fin: task.date_fin,
            statut: TaskStatus::parse(&task.statut).unwrap_or(TaskStatus::Prevu),
            chantier_id: task.chantier_id,
            sav_ticket_id: task.sav_ticket_id,
            ouvrier_ids,
            sous_traitant_ids,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn map_store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        StoreError::InvalidRange | StoreError::DayNotCovered(_) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::Conflict { .. } => (StatusCode::CONFLICT, e.to_string()),
        StoreError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn get_conn(state: &AppState) -> Result<
    diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    (StatusCode, String),
> {
    state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))
}

fn respond_with_assignments(
    conn: &mut PgConnection,
    task: PlanningTask,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let (mut ouvriers, mut sous) =
        store::assignments_for(conn, &[task.id]).map_err(map_store_error)?;
    let ouvrier_ids = ouvriers.remove(&task.id).unwrap_or_default();
    let sous_traitant_ids = sous.remove(&task.id).unwrap_or_default();
    Ok(Json(TaskResponse::from_task(task, ouvrier_ids, sous_traitant_ids)))
}

// Resource registry: read-only lists for the planning UI.
pub async fn list_chantiers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Chantier>>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;
    let rows = store::list_chantiers(&mut conn).map_err(map_store_error)?;
    Ok(Json(rows))
}

pub async fn list_ouvriers_internes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OuvrierInterne>>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;
    let rows = store::list_ouvriers(&mut conn).map_err(map_store_error)?;
    Ok(Json(rows))
}

pub async fn list_sous_traitants(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SousTraitant>>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;
    let rows = store::list_sous_traitants(&mut conn).map_err(map_store_error)?;
    Ok(Json(rows))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskResponse>>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;

    let from = query
        .from
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc());
    let to = query
        .to
        .map(|d| d + Duration::days(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc());

    let rows = store::list_tasks_between(&mut conn, from, to).map_err(map_store_error)?;
    let ids: Vec<Uuid> = rows.iter().map(|t| t.id).collect();
    let (mut ouvriers, mut sous) =
        store::assignments_for(&mut conn, &ids).map_err(map_store_error)?;

    let responses = rows
        .into_iter()
        .map(|task| {
            let ouvrier_ids = ouvriers.remove(&task.id).unwrap_or_default();
            let sous_traitant_ids = sous.remove(&task.id).unwrap_or_default();
            TaskResponse::from_task(task, ouvrier_ids, sous_traitant_ids)
        })
        .collect();

    Ok(Json(responses))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;

    let data = NewTaskData {
        titre: req.titre,
        description: req.description,
        date_debut: req.date_debut,
        date_fin: req.date_fin,
        statut: req.statut.unwrap_or(TaskStatus::Prevu),
        chantier_id: req.chantier_id,
        sav_ticket_id: req.sav_ticket_id,
        ouvrier_ids: req.ouvrier_ids.unwrap_or_default(),
        sous_traitant_ids: req.sous_traitant_ids.unwrap_or_default(),
    };

    let task = store::insert_task(&mut conn, &data, state.config.planning.overlap_policy)
        .map_err(map_store_error)?;
    respond_with_assignments(&mut conn, task)
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;

    let changes = TaskChanges {
        titre: req.titre,
        description: req.description,
        date_debut: req.date_debut,
        date_fin: req.date_fin,
        statut: req.statut,
        chantier_id: req.chantier_id,
        sav_ticket_id: req.sav_ticket_id,
        ouvrier_ids: req.ouvrier_ids,
        sous_traitant_ids: req.sous_traitant_ids,
    };

    let task = store::update_task(&mut conn, id, &changes, state.config.planning.overlap_policy)
        .map_err(map_store_error)?;
    respond_with_assignments(&mut conn, task)
}

pub async fn set_task_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;

    let changes = TaskChanges {
        statut: Some(req.statut),
        ..TaskChanges::default()
    };
    let task = store::update_task(&mut conn, id, &changes, state.config.planning.overlap_policy)
        .map_err(map_store_error)?;
    respond_with_assignments(&mut conn, task)
}

/// PATCH carrying `{action: "removeDay", date}`: shrinks the task's coverage
/// instead of deleting the row. Any other action is rejected.
pub async fn patch_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchTaskRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if req.action != "removeDay" {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unsupported action: {}", req.action),
        ));
    }
    let date = req
        .date
        .ok_or((StatusCode::BAD_REQUEST, "missing date".to_string()))?;

    let mut conn = get_conn(&state)?;
    let outcome = store::remove_day(&mut conn, id, date).map_err(map_store_error)?;

    Ok(Json(match outcome {
        RemoveDayOutcome::Deleted => serde_json::json!({"removed": "task"}),
        RemoveDayOutcome::Trimmed => serde_json::json!({"removed": "day"}),
        RemoveDayOutcome::Split { second_task_id } => {
            serde_json::json!({"removed": "day", "second_task_id": second_task_id})
        }
    }))
}

/// DELETE accepts either a plain task id (full delete) or the synthetic
/// `{id}-{YYYY-MM-DD}` form shown by the calendar, which removes only that
/// day of the task.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let task_ref = TaskRef::parse(&raw_id)
        .ok_or((StatusCode::BAD_REQUEST, format!("invalid task id: {raw_id}")))?;

    let mut conn = get_conn(&state)?;
    match task_ref {
        TaskRef::Whole(id) => {
            store::delete_task(&mut conn, id).map_err(map_store_error)?;
        }
        TaskRef::DaySlice(id, date) => {
            store::remove_day(&mut conn, id, date).map_err(map_store_error)?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

fn batch_response(outcome: BatchOutcome) -> Result<Json<BatchCreateResponse>, (StatusCode, String)> {
    if outcome.failed.is_empty() {
        return Ok(Json(BatchCreateResponse {
            first_task_id: outcome.first_task_id,
            created: outcome.created,
        }));
    }

    let days: Vec<String> = outcome
        .failed
        .iter()
        .map(|(date, reason)| format!("{date}: {reason}"))
        .collect();
    Err((
        StatusCode::INTERNAL_SERVER_ERROR,
        format!(
            "{} of {} day(s) failed ({} task(s) already created were kept): {}",
            outcome.failed.len(),
            outcome.failed.len() + outcome.created,
            outcome.created,
            days.join("; ")
        ),
    ))
}

/// One logical request, one task row per included day. Days are created
/// independently; a later failure keeps earlier rows.
pub async fn create_task_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchCreateRequest>,
) -> Result<Json<BatchCreateResponse>, (StatusCode, String)> {
    if req.duration_days == 0 {
        return Err((StatusCode::BAD_REQUEST, "duration_days must be at least 1".to_string()));
    }

    let mut conn = get_conn(&state)?;
    let plan = req.into_plan();
    let outcome = store::create_batch(&mut conn, &plan, state.config.planning.overlap_policy);
    batch_response(outcome)
}

/// Same plan, anchored one week later. Independent creation; nothing links
/// back to the source tasks.
pub async fn duplicate_week(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchCreateRequest>,
) -> Result<Json<BatchCreateResponse>, (StatusCode, String)> {
    if req.duration_days == 0 {
        return Err((StatusCode::BAD_REQUEST, "duration_days must be at least 1".to_string()));
    }

    let mut conn = get_conn(&state)?;
    let plan = req.into_plan().shift_week();
    let outcome = store::create_batch(&mut conn, &plan, state.config.planning.overlap_policy);
    batch_response(outcome)
}

pub async fn get_task_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<store::TaskStats>, (StatusCode, String)> {
    let mut conn = get_conn(&state)?;
    let stats = store::task_stats(&mut conn).map_err(map_store_error)?;
    Ok(Json(stats))
}

pub fn configure_planning_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::PLANNING_CHANTIERS, get(list_chantiers))
        .route(ApiUrls::PLANNING_OUVRIERS, get(list_ouvriers_internes))
        .route(ApiUrls::PLANNING_SOUS_TRAITANTS, get(list_sous_traitants))
        .route(ApiUrls::PLANNING_TASKS, get(list_tasks).post(create_task))
        .route(ApiUrls::PLANNING_TASKS_STATS, get(get_task_stats))
        .route(ApiUrls::PLANNING_TASKS_BATCH, post(create_task_batch))
        .route(ApiUrls::PLANNING_TASKS_DUPLICATE_WEEK, post(duplicate_week))
        .route(
            ApiUrls::PLANNING_TASK_BY_ID,
            put(update_task).patch(patch_task).delete(delete_task),
        )
        .route(ApiUrls::PLANNING_TASK_STATUS, put(set_task_status))
        .route(ApiUrls::PLANNING_EXPORT_PDF, post(export::export_pdf))
}
