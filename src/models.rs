use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurringRule;

/// Category assigned to tasks created without an explicit one.
pub const DEFAULT_CATEGORY: &str = "Personal";

/// Colour given to categories created without an explicit one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#5B67F5";

/// How important a task is.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{other}' (expected high, medium or low)")),
        }
    }
}

/// Represents a single task record held by a store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned by the store.
    pub id: u64,
    /// What needs doing.
    pub title: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Free-form category name, e.g. "Work".
    pub category: String,
    /// Optional due date (date only, no time component).
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Sort key; lists are ordered by this ascending.
    pub order: i64,
    /// The rule this task was generated from, kept for display only.
    #[serde(default)]
    pub recurring: Option<RecurringRule>,
    /// Id of the first task of the recurring series this task belongs to.
    #[serde(default)]
    pub recurring_parent: Option<u64>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurring.is_some()
    }
}

/// Where a new task sits inside a batch-created recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesLink {
    /// First task of the series; the others point at it.
    Root,
    /// Linked to the root created in the same batch.
    Member,
}

/// Fields of a task that does not have an identity yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub order: i64,
    pub recurring: Option<RecurringRule>,
    pub series: Option<SeriesLink>,
}

impl NewTask {
    /// A plain, non-recurring task stamped with the current time.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        NewTask {
            title: title.into(),
            priority: Priority::default(),
            category: DEFAULT_CATEGORY.to_string(),
            due_date: None,
            created_at: now,
            order: now.timestamp_millis(),
            recurring: None,
            series: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_due_date(mut self, due: Option<NaiveDate>) -> Self {
        self.due_date = due;
        self
    }

    /// Builds the stored record once the store has picked an id.
    pub(crate) fn into_task(self, id: u64, recurring_parent: Option<u64>) -> Task {
        Task {
            id,
            title: self.title.trim().to_string(),
            completed: false,
            priority: self.priority,
            category: self.category,
            due_date: self.due_date,
            created_at: self.created_at,
            order: self.order,
            recurring: self.recurring,
            recurring_parent,
        }
    }
}

/// Partial update applied by [`crate::storage::TaskStore::update`].
///
/// `None` leaves a field untouched. `due_date` is doubly optional so a due
/// date can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(t) = self.title { task.title = t.trim().to_string(); }
        if let Some(c) = self.completed { task.completed = c; }
        if let Some(p) = self.priority { task.priority = p; }
        if let Some(c) = self.category { task.category = c; }
        if let Some(d) = self.due_date { task.due_date = d; }
    }
}

/// Restricts which tasks [`crate::storage::TaskStore::list`] returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Only tasks in this category (case-insensitive).
    pub category: Option<String>,
    /// Only tasks whose completion flag matches.
    pub completed: Option<bool>,
}

impl TaskFilter {
    pub fn category(name: impl Into<String>) -> Self {
        TaskFilter { category: Some(name.into()), completed: None }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(c) = &self.category {
            if !same_category(&task.category, c) {
                return false;
            }
        }
        match self.completed {
            Some(done) => task.completed == done,
            None => true,
        }
    }
}

/// Lookup key for a category name. Matching, uniqueness and counting all
/// go through this, so they agree for non-ASCII names too.
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether two category names refer to the same category.
pub fn same_category(a: &str, b: &str) -> bool {
    category_key(a) == category_key(b)
}

/// A named group of tasks shown in the sidebar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

/// Partial update for a category.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_short_forms() {
        assert_eq!("H".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn filter_matches_category_case_insensitively() {
        let task = NewTask::new("Buy milk").with_category("Shopping").into_task(1, None);
        assert!(TaskFilter::category("shopping").matches(&task));
        assert!(!TaskFilter::category("Work").matches(&task));

        let active = TaskFilter { category: None, completed: Some(false) };
        assert!(active.matches(&task));
    }

    #[test]
    fn category_names_fold_unicode_case_and_whitespace() {
        assert!(same_category(" Études ", "ÉTUDES"));
        assert_eq!(category_key("  Work "), "work");
        assert!(!same_category("Work", "Home"));
    }

    #[test]
    fn patch_can_clear_due_date() {
        let mut task = NewTask::new("Dentist")
            .with_due_date(NaiveDate::from_ymd_opt(2025, 3, 1))
            .into_task(1, None);
        TaskPatch { due_date: Some(None), ..Default::default() }.apply(&mut task);
        assert_eq!(task.due_date, None);
    }
}
