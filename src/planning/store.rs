use chrono::{DateTime, Duration, NaiveDate, Utc};
use diesel::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::config::OverlapPolicy;
use crate::shared::schema::{
    chantiers, ouvriers_internes, planning_task_ouvriers, planning_task_sous_traitants,
    planning_tasks, sous_traitants,
};

use super::materialize::{materialize, TaskPlan};
use super::{
    Chantier, OuvrierInterne, PlanningTask, SousTraitant, TaskOuvrier, TaskSousTraitant,
    TaskStatus,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("date_debut must be before date_fin")]
    InvalidRange,
    #[error("resource {resource} is already assigned to an overlapping task")]
    Conflict { resource: Uuid },
    #[error("task not found")]
    NotFound,
    #[error("task does not cover {0}")]
    DayNotCovered(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct NewTaskData {
    pub titre: String,
    pub description: Option<String>,
    pub date_debut: DateTime<Utc>,
    pub date_fin: DateTime<Utc>,
    pub statut: TaskStatus,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub ouvrier_ids: Vec<Uuid>,
    pub sous_traitant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
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

#[derive(Debug)]
pub enum RemoveDayOutcome {
    Deleted,
    Trimmed,
    Split { second_task_id: Uuid },
}

/// Result of a best-effort multi-day creation. Rows created before a failing
/// day are never rolled back; failed days are reported after every day was
/// attempted.
#[derive(Debug)]
pub struct BatchOutcome {
    pub first_task_id: Option<Uuid>,
    pub created: usize,
    pub failed: Vec<(NaiveDate, String)>,
}

pub fn get_task(conn: &mut PgConnection, id: Uuid) -> Result<PlanningTask, StoreError> {
    planning_tasks::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or(StoreError::NotFound)
}

pub fn list_tasks_between(
    conn: &mut PgConnection,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<PlanningTask>, StoreError> {
    let mut q = planning_tasks::table.into_boxed();
    if let Some(to) = to {
        q = q.filter(planning_tasks::date_debut.lt(to));
    }
    if let Some(from) = from {
        q = q.filter(planning_tasks::date_fin.gt(from));
    }
    Ok(q.order(planning_tasks::date_debut.asc()).load(conn)?)
}

/// Assignment id arrays for a set of tasks, keyed by task id.
pub fn assignments_for(
    conn: &mut PgConnection,
    task_ids: &[Uuid],
) -> Result<(HashMap<Uuid, Vec<Uuid>>, HashMap<Uuid, Vec<Uuid>>), StoreError> {
    let ouvrier_rows: Vec<TaskOuvrier> = planning_task_ouvriers::table
        .filter(planning_task_ouvriers::task_id.eq_any(task_ids))
        .load(conn)?;
    let sous_traitant_rows: Vec<TaskSousTraitant> = planning_task_sous_traitants::table
        .filter(planning_task_sous_traitants::task_id.eq_any(task_ids))
        .load(conn)?;

    let mut ouvriers: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in ouvrier_rows {
        ouvriers.entry(row.task_id).or_default().push(row.ouvrier_id);
    }
    let mut sous: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in sous_traitant_rows {
        sous.entry(row.task_id).or_default().push(row.sous_traitant_id);
    }
    Ok((ouvriers, sous))
}

fn find_conflict(
    conn: &mut PgConnection,
    ouvrier_ids: &[Uuid],
    sous_traitant_ids: &[Uuid],
    debut: DateTime<Utc>,
    fin: DateTime<Utc>,
    exclude_task: Option<Uuid>,
) -> Result<Option<Uuid>, diesel::result::Error> {
    if !ouvrier_ids.is_empty() {
        let mut q = planning_task_ouvriers::table
            .inner_join(planning_tasks::table)
            .select(planning_task_ouvriers::ouvrier_id)
            .filter(planning_task_ouvriers::ouvrier_id.eq_any(ouvrier_ids))
            .filter(planning_tasks::date_debut.lt(fin))
            .filter(planning_tasks::date_fin.gt(debut))
            .into_boxed();
        if let Some(exclude) = exclude_task {
            q = q.filter(planning_tasks::id.ne(exclude));
        }
        let hit: Option<Uuid> = q.first(conn).optional()?;
        if hit.is_some() {
            return Ok(hit);
        }
    }

    if !sous_traitant_ids.is_empty() {
        let mut q = planning_task_sous_traitants::table
            .inner_join(planning_tasks::table)
            .select(planning_task_sous_traitants::sous_traitant_id)
            .filter(planning_task_sous_traitants::sous_traitant_id.eq_any(sous_traitant_ids))
            .filter(planning_tasks::date_debut.lt(fin))
            .filter(planning_tasks::date_fin.gt(debut))
            .into_boxed();
        if let Some(exclude) = exclude_task {
            q = q.filter(planning_tasks::id.ne(exclude));
        }
        let hit: Option<Uuid> = q.first(conn).optional()?;
        if hit.is_some() {
            return Ok(hit);
        }
    }

    Ok(None)
}

fn insert_assignments(
    conn: &mut PgConnection,
    task_id: Uuid,
    ouvrier_ids: &[Uuid],
    sous_traitant_ids: &[Uuid],
) -> Result<(), diesel::result::Error> {
    let ouvrier_rows: Vec<TaskOuvrier> = ouvrier_ids
        .iter()
        .map(|&ouvrier_id| TaskOuvrier { task_id, ouvrier_id })
        .collect();
    if !ouvrier_rows.is_empty() {
        diesel::insert_into(planning_task_ouvriers::table)
            .values(&ouvrier_rows)
            .execute(conn)?;
    }

    let sous_rows: Vec<TaskSousTraitant> = sous_traitant_ids
        .iter()
        .map(|&sous_traitant_id| TaskSousTraitant {
            task_id,
            sous_traitant_id,
        })
        .collect();
    if !sous_rows.is_empty() {
        diesel::insert_into(planning_task_sous_traitants::table)
            .values(&sous_rows)
            .execute(conn)?;
    }

    Ok(())
}

fn delete_assignments(conn: &mut PgConnection, task_id: Uuid) -> Result<(), diesel::result::Error> {
    diesel::delete(
        planning_task_ouvriers::table.filter(planning_task_ouvriers::task_id.eq(task_id)),
    )
    .execute(conn)?;
    diesel::delete(
        planning_task_sous_traitants::table
            .filter(planning_task_sous_traitants::task_id.eq(task_id)),
    )
    .execute(conn)?;
    Ok(())
}

pub fn insert_task(
    conn: &mut PgConnection,
    data: &NewTaskData,
    policy: OverlapPolicy,
) -> Result<PlanningTask, StoreError> {
    if data.date_debut >= data.date_fin {
        return Err(StoreError::InvalidRange);
    }

    if policy == OverlapPolicy::Reject {
        if let Some(resource) = find_conflict(
            conn,
            &data.ouvrier_ids,
            &data.sous_traitant_ids,
            data.date_debut,
            data.date_fin,
            None,
        )? {
            return Err(StoreError::Conflict { resource });
        }
    }

    let now = Utc::now();
    let task = PlanningTask {
        id: Uuid::new_v4(),
        titre: data.titre.clone(),
        description: data.description.clone(),
        date_debut: data.date_debut,
        date_fin: data.date_fin,
        statut: data.statut.as_str().to_string(),
        chantier_id: data.chantier_id,
        sav_ticket_id: data.sav_ticket_id,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(planning_tasks::table)
        .values(&task)
        .execute(conn)?;
    insert_assignments(conn, task.id, &data.ouvrier_ids, &data.sous_traitant_ids)?;

    Ok(task)
}

pub fn update_task(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &TaskChanges,
    policy: OverlapPolicy,
) -> Result<PlanningTask, StoreError> {
    let current = get_task(conn, id)?;

    let debut = changes.date_debut.unwrap_or(current.date_debut);
    let fin = changes.date_fin.unwrap_or(current.date_fin);
    if debut >= fin {
        return Err(StoreError::InvalidRange);
    }

    if policy == OverlapPolicy::Reject {
        let (ouvriers, sous) = assignments_for(conn, &[id])?;
        let ouvrier_ids = changes
            .ouvrier_ids
            .clone()
            .unwrap_or_else(|| ouvriers.get(&id).cloned().unwrap_or_default());
        let sous_traitant_ids = changes
            .sous_traitant_ids
            .clone()
            .unwrap_or_else(|| sous.get(&id).cloned().unwrap_or_default());
        if let Some(resource) =
            find_conflict(conn, &ouvrier_ids, &sous_traitant_ids, debut, fin, Some(id))?
        {
            return Err(StoreError::Conflict { resource });
        }
    }

    let now = Utc::now();
    diesel::update(planning_tasks::table.find(id))
        .set((
            planning_tasks::date_debut.eq(debut),
            planning_tasks::date_fin.eq(fin),
            planning_tasks::updated_at.eq(now),
        ))
        .execute(conn)?;

    if let Some(titre) = &changes.titre {
        diesel::update(planning_tasks::table.find(id))
            .set(planning_tasks::titre.eq(titre))
            .execute(conn)?;
    }
    if let Some(description) = &changes.description {
        diesel::update(planning_tasks::table.find(id))
            .set(planning_tasks::description.eq(description))
            .execute(conn)?;
    }
    if let Some(statut) = changes.statut {
        diesel::update(planning_tasks::table.find(id))
            .set(planning_tasks::statut.eq(statut.as_str()))
            .execute(conn)?;
    }
    if let Some(chantier_id) = changes.chantier_id {
        diesel::update(planning_tasks::table.find(id))
            .set(planning_tasks::chantier_id.eq(chantier_id))
            .execute(conn)?;
    }
    if let Some(sav_ticket_id) = changes.sav_ticket_id {
        diesel::update(planning_tasks::table.find(id))
            .set(planning_tasks::sav_ticket_id.eq(sav_ticket_id))
            .execute(conn)?;
    }
    if let Some(ouvrier_ids) = &changes.ouvrier_ids {
        diesel::delete(
            planning_task_ouvriers::table.filter(planning_task_ouvriers::task_id.eq(id)),
        )
        .execute(conn)?;
        insert_assignments(conn, id, ouvrier_ids, &[])?;
    }
    if let Some(sous_traitant_ids) = &changes.sous_traitant_ids {
        diesel::delete(
            planning_task_sous_traitants::table
                .filter(planning_task_sous_traitants::task_id.eq(id)),
        )
        .execute(conn)?;
        insert_assignments(conn, id, &[], sous_traitant_ids)?;
    }

    get_task(conn, id)
}

pub fn delete_task(conn: &mut PgConnection, id: Uuid) -> Result<(), StoreError> {
    let _ = get_task(conn, id)?;
    delete_assignments(conn, id)?;
    diesel::delete(planning_tasks::table.find(id)).execute(conn)?;
    Ok(())
}

/// Removes one displayed day from a task by shrinking its date coverage.
/// Trims at either edge, splits the row in two for an interior day, and
/// deletes outright when the task only covers the requested day.
pub fn remove_day(
    conn: &mut PgConnection,
    id: Uuid,
    date: NaiveDate,
) -> Result<RemoveDayOutcome, StoreError> {
    let task = get_task(conn, id)?;

    let first_day = task.date_debut.naive_utc().date();
    let last_day = task.date_fin.naive_utc().date();
    if date < first_day || date > last_day {
        return Err(StoreError::DayNotCovered(date));
    }

    let now = Utc::now();

    if first_day == last_day {
        delete_assignments(conn, id)?;
        diesel::delete(planning_tasks::table.find(id)).execute(conn)?;
        return Ok(RemoveDayOutcome::Deleted);
    }

    if date == first_day {
        let new_debut = (date + Duration::days(1))
            .and_time(task.date_debut.naive_utc().time())
            .and_utc();
        diesel::update(planning_tasks::table.find(id))
            .set((
                planning_tasks::date_debut.eq(new_debut),
                planning_tasks::updated_at.eq(now),
            ))
            .execute(conn)?;
        return Ok(RemoveDayOutcome::Trimmed);
    }

    if date == last_day {
        let new_fin = (date - Duration::days(1))
            .and_time(task.date_fin.naive_utc().time())
            .and_utc();
        diesel::update(planning_tasks::table.find(id))
            .set((
                planning_tasks::date_fin.eq(new_fin),
                planning_tasks::updated_at.eq(now),
            ))
            .execute(conn)?;
        return Ok(RemoveDayOutcome::Trimmed);
    }

    // Interior day: the first row keeps the head of the interval, a new row
    // with copied assignments takes the tail.
    let head_fin = (date - Duration::days(1))
        .and_time(task.date_fin.naive_utc().time())
        .and_utc();
    let tail_debut = (date + Duration::days(1))
        .and_time(task.date_debut.naive_utc().time())
        .and_utc();

    diesel::update(planning_tasks::table.find(id))
        .set((
            planning_tasks::date_fin.eq(head_fin),
            planning_tasks::updated_at.eq(now),
        ))
        .execute(conn)?;

    let tail = PlanningTask {
        id: Uuid::new_v4(),
        titre: task.titre.clone(),
        description: task.description.clone(),
        date_debut: tail_debut,
        date_fin: task.date_fin,
        statut: task.statut.clone(),
        chantier_id: task.chantier_id,
        sav_ticket_id: task.sav_ticket_id,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(planning_tasks::table)
        .values(&tail)
        .execute(conn)?;

    let (ouvriers, sous) = assignments_for(conn, &[id])?;
    insert_assignments(
        conn,
        tail.id,
        ouvriers.get(&id).map(Vec::as_slice).unwrap_or(&[]),
        sous.get(&id).map(Vec::as_slice).unwrap_or(&[]),
    )?;

    Ok(RemoveDayOutcome::Split {
        second_task_id: tail.id,
    })
}

/// Expands a plan and inserts one row per included day. Every insert is an
/// independent statement; a failing day never undoes the days already
/// created, and every day is attempted before the outcome is reported.
pub fn create_batch(
    conn: &mut PgConnection,
    plan: &TaskPlan,
    policy: OverlapPolicy,
) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        first_task_id: None,
        created: 0,
        failed: Vec::new(),
    };

    for slot in materialize(plan) {
        let data = NewTaskData {
            titre: plan.titre.clone(),
            description: plan.description.clone(),
            date_debut: slot.debut.and_utc(),
            date_fin: slot.fin.and_utc(),
            statut: plan.statut,
            chantier_id: plan.chantier_id,
            sav_ticket_id: plan.sav_ticket_id,
            ouvrier_ids: plan.ouvrier_ids.clone(),
            sous_traitant_ids: plan.sous_traitant_ids.clone(),
        };
        match insert_task(conn, &data, policy) {
            Ok(task) => {
                outcome.created += 1;
                if outcome.first_task_id.is_none() {
                    outcome.first_task_id = Some(task.id);
                }
            }
            Err(e) => {
                log::error!("day {} of batch creation failed: {}", slot.date, e);
                outcome.failed.push((slot.date, e.to_string()));
            }
        }
    }

    outcome
}

pub fn list_chantiers(conn: &mut PgConnection) -> Result<Vec<Chantier>, StoreError> {
    Ok(chantiers::table
        .order(chantiers::nom.asc())
        .load(conn)?)
}

pub fn list_ouvriers(conn: &mut PgConnection) -> Result<Vec<OuvrierInterne>, StoreError> {
    Ok(ouvriers_internes::table
        .filter(ouvriers_internes::actif.eq(true))
        .order(ouvriers_internes::nom.asc())
        .load(conn)?)
}

pub fn list_sous_traitants(conn: &mut PgConnection) -> Result<Vec<SousTraitant>, StoreError> {
    Ok(sous_traitants::table
        .filter(sous_traitants::actif.eq(true))
        .order(sous_traitants::nom.asc())
        .load(conn)?)
}

#[derive(Debug, serde::Serialize)]
pub struct TaskStats {
    pub total: i64,
    pub prevu: i64,
    pub en_cours: i64,
    pub termine: i64,
    pub en_retard: i64,
}

pub fn task_stats(conn: &mut PgConnection) -> Result<TaskStats, StoreError> {
    let total: i64 = planning_tasks::table.count().get_result(conn).unwrap_or(0);

    let count_for = |conn: &mut PgConnection, statut: TaskStatus| -> i64 {
        planning_tasks::table
            .filter(planning_tasks::statut.eq(statut.as_str()))
            .count()
            .get_result(conn)
            .unwrap_or(0)
    };

    let prevu = count_for(conn, TaskStatus::Prevu);
    let en_cours = count_for(conn, TaskStatus::EnCours);
    let termine = count_for(conn, TaskStatus::Termine);

    let now = Utc::now();
    let en_retard: i64 = planning_tasks::table
        .filter(planning_tasks::statut.ne(TaskStatus::Termine.as_str()))
        .filter(planning_tasks::date_fin.lt(now))
        .count()
        .get_result(conn)
        .unwrap_or(0);

    Ok(TaskStats {
        total,
        prevu,
        en_cours,
        termine,
        en_retard,
    })
}
