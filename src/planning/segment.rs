use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Sub-day window a task occupies on a given calendar day, relative to the
/// site business hours: 07:30-12:00 and 13:00-16:30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaySegment {
    Full,
    Am,
    Pm,
}

fn morning() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    )
}

fn afternoon() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
    )
}

impl DaySegment {
    /// Concrete hour window applied when a task is materialized on a date.
    /// `Full` spans the lunch gap.
    pub fn window(&self) -> (NaiveTime, NaiveTime) {
        match self {
            DaySegment::Full => (morning().0, afternoon().1),
            DaySegment::Am => morning(),
            DaySegment::Pm => afternoon(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DaySegment::Full => "full",
            DaySegment::Am => "am",
            DaySegment::Pm => "pm",
        }
    }
}

/// Classifies which business-hour window of `day` the interval
/// [`start`, `end`) occupies. `None` means the task is not shown that day.
/// Pure; evaluated independently for every (task, day) pair when laying out
/// a multi-day grid.
pub fn day_segment(start: NaiveDateTime, end: NaiveDateTime, day: NaiveDate) -> Option<DaySegment> {
    let overlaps = |window: (NaiveTime, NaiveTime)| {
        let window_start = day.and_time(window.0);
        let window_end = day.and_time(window.1);
        start < window_end && end > window_start
    };

    let covers_am = overlaps(morning());
    let covers_pm = overlaps(afternoon());

    match (covers_am, covers_pm) {
        (true, true) => Some(DaySegment::Full),
        (true, false) => Some(DaySegment::Am),
        (false, true) => Some(DaySegment::Pm),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        day.and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    #[test]
    fn morning_only_task_is_am() {
        let day = date(2025, 3, 17);
        assert_eq!(day_segment(at(day, 8, 0), at(day, 11, 0), day), Some(DaySegment::Am));
    }

    #[test]
    fn afternoon_only_task_is_pm() {
        let day = date(2025, 3, 17);
        assert_eq!(day_segment(at(day, 13, 30), at(day, 16, 0), day), Some(DaySegment::Pm));
    }

    #[test]
    fn spanning_both_windows_is_full() {
        let day = date(2025, 3, 17);
        assert_eq!(day_segment(at(day, 9, 0), at(day, 15, 0), day), Some(DaySegment::Full));
    }

    #[test]
    fn full_business_day_including_lunch_gap_is_full() {
        let day = date(2025, 3, 17);
        assert_eq!(
            day_segment(at(day, 7, 30), at(day, 16, 30), day),
            Some(DaySegment::Full)
        );
    }

    #[test]
    fn lunch_break_interval_is_not_shown() {
        let day = date(2025, 3, 17);
        assert_eq!(day_segment(at(day, 12, 0), at(day, 13, 0), day), None);
    }

    #[test]
    fn task_on_another_day_is_not_shown() {
        let day = date(2025, 3, 17);
        let other = date(2025, 3, 18);
        assert_eq!(day_segment(at(other, 8, 0), at(other, 16, 0), day), None);
    }

    #[test]
    fn task_ending_at_window_start_is_not_shown() {
        let day = date(2025, 3, 17);
        assert_eq!(day_segment(at(day, 6, 0), at(day, 7, 30), day), None);
    }

    #[test]
    fn multi_day_task_covers_interior_day_fully() {
        let monday = date(2025, 6, 2);
        let wednesday = date(2025, 6, 4);
        let tuesday = date(2025, 6, 3);
        assert_eq!(
            day_segment(at(monday, 7, 30), at(wednesday, 16, 30), tuesday),
            Some(DaySegment::Full)
        );
    }

    #[test]
    fn ends_mid_morning_on_last_day() {
        let monday = date(2025, 6, 2);
        let tuesday = date(2025, 6, 3);
        assert_eq!(
            day_segment(at(monday, 7, 30), at(tuesday, 12, 0), tuesday),
            Some(DaySegment::Am)
        );
    }

    #[test]
    fn segment_windows_match_business_hours() {
        let (start, end) = DaySegment::Full.window();
        assert_eq!(start, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(16, 30, 0).unwrap());
        let (start, end) = DaySegment::Am.window();
        assert_eq!(start, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let (start, end) = DaySegment::Pm.window();
        assert_eq!(start, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(16, 30, 0).unwrap());
    }
}
