pub mod commands;
pub mod config;
pub mod due;
pub mod error;
pub mod logging;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod tui;

pub use error::{Error, Result};
