use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::ConfigError;

/// Problems with a recurring rule as typed by the user.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("empty repeat rule")]
    Empty,

    #[error("unknown repeat pattern '{0}' (expected daily, weekly, monthly or custom)")]
    UnknownPattern(String),

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error("unknown unit '{0}' (expected days, weeks, months or years)")]
    UnknownUnit(String),

    #[error("invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("'{0}' needs a value")]
    MissingValue(String),

    #[error("unexpected '{0}' in repeat rule")]
    UnexpectedToken(String),

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("pick at least one day for a weekly repeat")]
    NoDaysSelected,
}

/// Failures reading or writing task and category records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("category {0} not found")]
    CategoryNotFound(u64),

    #[error("category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("category name must not be empty")]
    EmptyName,
}

/// Top-level error for commands run from the CLI or the TUI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("category '{0}' not found")]
    UnknownCategory(String),

    #[error("'{0}' is the default category and cannot be removed")]
    DefaultCategory(String),

    #[error("nothing to change")]
    EmptyPatch,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
