use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::state::AppState;

use super::segment::{day_segment, DaySegment};
use super::store;

const DAY_LABELS: [&str; 6] = ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi"];
const DEFAULT_COLOR: &str = "#e0e0e0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Ouvrier,
    SousTraitant,
}

#[derive(Debug, Clone)]
pub struct ResourceRow {
    pub id: Uuid,
    pub label: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone)]
pub struct ExportTask {
    pub titre: String,
    pub debut: NaiveDateTime,
    pub fin: NaiveDateTime,
    pub couleur: Option<String>,
    pub ouvrier_ids: Vec<Uuid>,
    pub sous_traitant_ids: Vec<Uuid>,
}

impl ExportTask {
    fn involves(&self, resource: &ResourceRow) -> bool {
        match resource.kind {
            ResourceKind::Ouvrier => self.ouvrier_ids.contains(&resource.id),
            ResourceKind::SousTraitant => self.sous_traitant_ids.contains(&resource.id),
        }
    }
}

/// Monday of the week containing `day`.
pub fn week_monday(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn segment_suffix(segment: DaySegment) -> &'static str {
    match segment {
        DaySegment::Full => "",
        DaySegment::Am => " (matin)",
        DaySegment::Pm => " (après-midi)",
    }
}

fn week_table(monday: NaiveDate, resources: &[ResourceRow], tasks: &[ExportTask]) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        "<h1>Planning ressources - semaine du {}</h1>\n",
        monday.format("%d/%m/%Y")
    ));
    html.push_str("<table>\n<thead><tr><th>Ressource</th>");
    for (offset, label) in DAY_LABELS.iter().enumerate() {
        let day = monday + Duration::days(offset as i64);
        html.push_str(&format!("<th>{} {}</th>", label, day.format("%d/%m")));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for resource in resources {
        html.push_str(&format!("<tr><td class=\"resource\">{}</td>", escape(&resource.label)));
        for offset in 0..DAY_LABELS.len() {
            let day = monday + Duration::days(offset as i64);
            html.push_str("<td>");
            for task in tasks.iter().filter(|t| t.involves(resource)) {
                if let Some(segment) = day_segment(task.debut, task.fin, day) {
                    let color = task.couleur.as_deref().unwrap_or(DEFAULT_COLOR);
                    html.push_str(&format!(
                        "<div class=\"task\" style=\"background:{}\">{}{}</div>",
                        color,
                        escape(&task.titre),
                        segment_suffix(segment)
                    ));
                }
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Fixed-layout document for the renderer: one page for the current week,
/// one for the next, resources as rows and Monday..Saturday as columns.
pub fn build_planning_html(
    first_monday: NaiveDate,
    resources: &[ResourceRow],
    tasks: &[ExportTask],
) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n\
         body { font-family: Arial, sans-serif; font-size: 10px; }\n\
         table { width: 100%; border-collapse: collapse; }\n\
         th, td { border: 1px solid #999; padding: 4px; vertical-align: top; }\n\
         td.resource { font-weight: bold; white-space: nowrap; }\n\
         div.task { margin: 1px 0; padding: 2px; border-radius: 2px; }\n\
         .page { page-break-after: always; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str("<div class=\"page\">\n");
    html.push_str(&week_table(first_monday, resources, tasks));
    html.push_str("</div>\n<div>\n");
    html.push_str(&week_table(first_monday + Duration::days(7), resources, tasks));
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub async fn export_pdf(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB error: {e}")))?;

    let today = Utc::now().date_naive();
    let monday = week_monday(today);
    let range_start = monday.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let range_end = (monday + Duration::days(14)).and_hms_opt(0, 0, 0).unwrap().and_utc();

    let ouvriers = store::list_ouvriers(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;
    let sous_traitants = store::list_sous_traitants(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;
    let chantiers = store::list_chantiers(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let mut resources: Vec<ResourceRow> = ouvriers
        .iter()
        .map(|o| ResourceRow {
            id: o.id,
            label: format!("{} {}", o.prenom, o.nom),
            kind: ResourceKind::Ouvrier,
        })
        .collect();
    resources.extend(sous_traitants.iter().map(|s| ResourceRow {
        id: s.id,
        label: s.nom.clone(),
        kind: ResourceKind::SousTraitant,
    }));

    let rows = store::list_tasks_between(&mut conn, Some(range_start), Some(range_end))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;
    let ids: Vec<Uuid> = rows.iter().map(|t| t.id).collect();
    let (ouvrier_map, sous_map) = store::assignments_for(&mut conn, &ids)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let tasks: Vec<ExportTask> = rows
        .into_iter()
        .map(|t| ExportTask {
            couleur: t
                .chantier_id
                .and_then(|cid| chantiers.iter().find(|c| c.id == cid))
                .map(|c| c.couleur.clone()),
            ouvrier_ids: ouvrier_map.get(&t.id).cloned().unwrap_or_default(),
            sous_traitant_ids: sous_map.get(&t.id).cloned().unwrap_or_default(),
            titre: t.titre,
            debut: t.date_debut.naive_utc(),
            fin: t.date_fin.naive_utc(),
        })
        .collect();

    let html = build_planning_html(monday, &resources, &tasks);

    let pdf = state.renderer.render_guarded(&html).await.map_err(|e| {
        log::error!("planning export failed: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    let filename = format!("planning-ressources-{}.pdf", today.format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        day.and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn week_monday_rolls_back_to_monday() {
        assert_eq!(week_monday(date(2025, 6, 4)), date(2025, 6, 2));
        assert_eq!(week_monday(date(2025, 6, 2)), date(2025, 6, 2));
        assert_eq!(week_monday(date(2025, 6, 8)), date(2025, 6, 2));
    }

    #[test]
    fn html_has_two_week_headings() {
        let html = build_planning_html(date(2025, 6, 2), &[], &[]);
        assert!(html.contains("semaine du 02/06/2025"));
        assert!(html.contains("semaine du 09/06/2025"));
        assert!(html.contains("page-break-after"));
    }

    #[test]
    fn task_lands_in_its_resource_row_with_chantier_color() {
        let ouvrier = Uuid::new_v4();
        let resources = vec![ResourceRow {
            id: ouvrier,
            label: "Jean Dupont".to_string(),
            kind: ResourceKind::Ouvrier,
        }];
        let monday = date(2025, 6, 2);
        let tasks = vec![ExportTask {
            titre: "Pose carrelage".to_string(),
            debut: at(monday, 7, 30),
            fin: at(monday, 12, 0),
            couleur: Some("#ff8800".to_string()),
            ouvrier_ids: vec![ouvrier],
            sous_traitant_ids: vec![],
        }];
        let html = build_planning_html(monday, &resources, &tasks);
        assert!(html.contains("Jean Dupont"));
        assert!(html.contains("Pose carrelage (matin)"));
        assert!(html.contains("background:#ff8800"));
    }

    #[test]
    fn unassigned_resource_gets_empty_cells() {
        let resources = vec![ResourceRow {
            id: Uuid::new_v4(),
            label: "Sous-traitant Étanchéité".to_string(),
            kind: ResourceKind::SousTraitant,
        }];
        let monday = date(2025, 6, 2);
        let tasks = vec![ExportTask {
            titre: "Hors semaine".to_string(),
            debut: at(date(2025, 7, 7), 7, 30),
            fin: at(date(2025, 7, 7), 16, 30),
            couleur: None,
            ouvrier_ids: vec![],
            sous_traitant_ids: vec![resources[0].id],
        }];
        let html = build_planning_html(monday, &resources, &tasks);
        assert!(!html.contains("Hors semaine"));
    }

    #[test]
    fn titles_are_html_escaped() {
        let ouvrier = Uuid::new_v4();
        let resources = vec![ResourceRow {
            id: ouvrier,
            label: "Jean".to_string(),
            kind: ResourceKind::Ouvrier,
        }];
        let monday = date(2025, 6, 2);
        let tasks = vec![ExportTask {
            titre: "Coffrage <niveau 2>".to_string(),
            debut: at(monday, 13, 0),
            fin: at(monday, 16, 30),
            couleur: None,
            ouvrier_ids: vec![ouvrier],
            sous_traitant_ids: vec![],
        }];
        let html = build_planning_html(monday, &resources, &tasks);
        assert!(html.contains("Coffrage &lt;niveau 2&gt;"));
    }
}
