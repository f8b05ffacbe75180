use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use uuid::Uuid;

use super::segment::DaySegment;
use super::TaskStatus;

/// One logical planning request covering `duration_days` calendar days from
/// `anchor`. Expansion turns it into independent per-day task rows.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub titre: String,
    pub description: Option<String>,
    pub anchor: NaiveDate,
    pub segment: DaySegment,
    pub duration_days: u32,
    pub statut: TaskStatus,
    pub chantier_id: Option<Uuid>,
    pub sav_ticket_id: Option<Uuid>,
    pub ouvrier_ids: Vec<Uuid>,
    pub sous_traitant_ids: Vec<Uuid>,
}

impl TaskPlan {
    /// Same plan anchored exactly one week later. Segment, duration and
    /// resource assignments are carried over unchanged; the duplicate has no
    /// link back to the source tasks.
    pub fn shift_week(mut self) -> Self {
        self.anchor += Duration::days(7);
        self
    }
}

/// Concrete start/end instants for one materialized day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub debut: NaiveDateTime,
    pub fin: NaiveDateTime,
}

/// The calendar days in [anchor, anchor + duration_days) whose weekday is
/// not Sunday. Saturdays are included; a Sunday inside the range is dropped,
/// not replaced.
pub fn expand_days(anchor: NaiveDate, duration_days: u32) -> Vec<NaiveDate> {
    (0..duration_days as i64)
        .map(|offset| anchor + Duration::days(offset))
        .filter(|day| day.weekday() != Weekday::Sun)
        .collect()
}

/// Expands a plan into one slot per included day, applying the chosen
/// segment's hour window to each date.
pub fn materialize(plan: &TaskPlan) -> Vec<DaySlot> {
    let (window_start, window_end) = plan.segment.window();
    expand_days(plan.anchor, plan.duration_days)
        .into_iter()
        .map(|date| DaySlot {
            date,
            debut: date.and_time(window_start),
            fin: date.and_time(window_end),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn plan(anchor: NaiveDate, segment: DaySegment, duration_days: u32) -> TaskPlan {
        TaskPlan {
            titre: "Pose carrelage".to_string(),
            description: None,
            anchor,
            segment,
            duration_days,
            statut: TaskStatus::Prevu,
            chantier_id: None,
            sav_ticket_id: None,
            ouvrier_ids: vec![Uuid::new_v4()],
            sous_traitant_ids: vec![],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn friday_anchor_spanning_weekend_skips_sunday() {
        // 2025-03-14 is a Friday; four calendar days cover Fri..Mon.
        let days = expand_days(date(2025, 3, 14), 4);
        assert_eq!(
            days,
            vec![date(2025, 3, 14), date(2025, 3, 15), date(2025, 3, 17)]
        );
    }

    #[test]
    fn monday_six_days_covers_monday_through_saturday() {
        let days = expand_days(date(2025, 6, 2), 6);
        assert_eq!(days.len(), 6);
        assert_eq!(days.first(), Some(&date(2025, 6, 2)));
        assert_eq!(days.last(), Some(&date(2025, 6, 7)));
    }

    #[test]
    fn monday_seven_days_still_yields_six_slots() {
        // Seven calendar days reach Sunday 2025-06-08, which is dropped.
        let days = expand_days(date(2025, 6, 2), 7);
        assert_eq!(days.len(), 6);
        assert!(!days.contains(&date(2025, 6, 8)));
    }

    #[test]
    fn materialized_slots_apply_segment_window() {
        let slots = materialize(&plan(date(2025, 6, 2), DaySegment::Am, 2));
        assert_eq!(slots.len(), 2);
        for slot in &slots {
            assert_eq!(slot.debut.time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
            assert_eq!(slot.fin.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        }
    }

    #[test]
    fn full_segment_spans_lunch_gap() {
        let slots = materialize(&plan(date(2025, 6, 2), DaySegment::Full, 1));
        assert_eq!(slots[0].debut.time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(slots[0].fin.time(), NaiveTime::from_hms_opt(16, 30, 0).unwrap());
    }

    #[test]
    fn shift_week_moves_anchor_seven_days_and_keeps_the_rest() {
        let source = plan(date(2025, 6, 2), DaySegment::Pm, 3);
        let ouvriers = source.ouvrier_ids.clone();
        let shifted = source.shift_week();
        assert_eq!(shifted.anchor, date(2025, 6, 9));
        assert_eq!(shifted.segment, DaySegment::Pm);
        assert_eq!(shifted.duration_days, 3);
        assert_eq!(shifted.ouvrier_ids, ouvriers);
    }

    #[test]
    fn shifted_plan_materializes_one_week_later() {
        let source = plan(date(2025, 3, 14), DaySegment::Full, 4);
        let original = materialize(&source);
        let shifted = materialize(&source.clone().shift_week());
        assert_eq!(original.len(), shifted.len());
        for (a, b) in original.iter().zip(shifted.iter()) {
            assert_eq!(b.date, a.date + Duration::days(7));
        }
    }
}
