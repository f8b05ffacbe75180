use chrono::NaiveDate;
use std::fmt;
use uuid::Uuid;

/// Reference to a planning task as addressed by the API: either the whole
/// row, or one displayed day of a multi-day row. The calendar shows each
/// covered day of a task as its own entry with an id of the form
/// `{task_id}-{YYYY-MM-DD}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRef {
    Whole(Uuid),
    DaySlice(Uuid, NaiveDate),
}

/// Splits a `{id}-{YYYY-MM-DD}` synthetic identifier into its id part and
/// date. The id part may itself contain dashes (UUIDs do), so the date is
/// taken from the trailing ten characters only.
pub fn split_synthetic(raw: &str) -> Option<(&str, NaiveDate)> {
    if raw.len() < 12 {
        return None;
    }
    let (head, tail) = raw.split_at(raw.len() - 10);
    if !head.ends_with('-') {
        return None;
    }
    let date = NaiveDate::parse_from_str(tail, "%Y-%m-%d").ok()?;
    Some((&head[..head.len() - 1], date))
}

impl TaskRef {
    pub fn parse(raw: &str) -> Option<TaskRef> {
        if let Some((id_part, date)) = split_synthetic(raw) {
            if let Ok(id) = Uuid::parse_str(id_part) {
                return Some(TaskRef::DaySlice(id, date));
            }
        }
        Uuid::parse_str(raw).ok().map(TaskRef::Whole)
    }

    pub fn task_id(&self) -> Uuid {
        match self {
            TaskRef::Whole(id) => *id,
            TaskRef::DaySlice(id, _) => *id,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Whole(id) => write!(f, "{}", id),
            TaskRef::DaySlice(id, date) => write!(f, "{}-{}", id, date.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_id_and_date() {
        let (id, date) = split_synthetic("abc123-2025-03-17").unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 17).unwrap());
    }

    #[test]
    fn splits_id_that_contains_dashes() {
        let (id, date) = split_synthetic("550e8400-e29b-41d4-a716-446655440000-2025-12-01").unwrap();
        assert_eq!(id, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
    }

    #[test]
    fn rejects_invalid_trailing_date() {
        assert!(split_synthetic("abc123-2025-13-45").is_none());
        assert!(split_synthetic("abc123").is_none());
    }

    #[test]
    fn parses_day_slice_of_uuid_task() {
        let id = Uuid::new_v4();
        let raw = format!("{}-2025-03-17", id);
        assert_eq!(
            TaskRef::parse(&raw),
            Some(TaskRef::DaySlice(id, NaiveDate::from_ymd_opt(2025, 3, 17).unwrap()))
        );
    }

    #[test]
    fn parses_whole_task_id() {
        let id = Uuid::new_v4();
        assert_eq!(TaskRef::parse(&id.to_string()), Some(TaskRef::Whole(id)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(TaskRef::parse("not-a-task"), None);
        assert_eq!(TaskRef::parse("abc123-2025-03-17"), None);
    }

    #[test]
    fn display_round_trips() {
        let id = Uuid::new_v4();
        let slice = TaskRef::DaySlice(id, NaiveDate::from_ymd_opt(2025, 3, 17).unwrap());
        assert_eq!(TaskRef::parse(&slice.to_string()), Some(slice));
        let whole = TaskRef::Whole(id);
        assert_eq!(TaskRef::parse(&whole.to_string()), Some(whole));
    }
}
