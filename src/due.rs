use chrono::{Local, NaiveDate};

use crate::models::Task;

/// Where a due date sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    Today,
    Tomorrow,
    Future,
}

impl DueStatus {
    /// Classifies `due` against `today`.
    pub fn classify(due: NaiveDate, today: NaiveDate) -> DueStatus {
        let days_left = (due - today).num_days();
        match days_left {
            d if d < 0 => DueStatus::Overdue,
            0 => DueStatus::Today,
            1 => DueStatus::Tomorrow,
            _ => DueStatus::Future,
        }
    }
}

/// Short label for a task card: "Today", "Tomorrow", "Overdue" or "Mar 4".
pub fn due_label(due: NaiveDate, today: NaiveDate) -> String {
    match DueStatus::classify(due, today) {
        DueStatus::Overdue => "Overdue".to_string(),
        DueStatus::Today => "Today".to_string(),
        DueStatus::Tomorrow => "Tomorrow".to_string(),
        DueStatus::Future => due.format("%b %-d").to_string(),
    }
}

/// Status of a task's due date as of the local calendar day.
///
/// Completed tasks and tasks without a due date have no status.
pub fn task_due_status(task: &Task) -> Option<DueStatus> {
    if task.completed {
        return None;
    }
    let today = Local::now().date_naive();
    task.due_date.map(|d| DueStatus::classify(d, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn classify_relative_to_today() {
        let today = date(2025, 3, 4);
        assert_eq!(DueStatus::classify(date(2025, 3, 1), today), DueStatus::Overdue);
        assert_eq!(DueStatus::classify(today, today), DueStatus::Today);
        assert_eq!(DueStatus::classify(date(2025, 3, 5), today), DueStatus::Tomorrow);
        assert_eq!(DueStatus::classify(date(2025, 4, 1), today), DueStatus::Future);
    }

    #[test]
    fn labels() {
        let today = date(2025, 3, 4);
        assert_eq!(due_label(date(2025, 3, 3), today), "Overdue");
        assert_eq!(due_label(date(2025, 3, 5), today), "Tomorrow");
        assert_eq!(due_label(date(2025, 12, 25), today), "Dec 25");
    }
}
