//! # TaskFlow
//!
//! A terminal to-do list. Add tasks with a priority, a category and an
//! optional due date, tick them off, search them, and generate whole
//! recurring series in one go.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! taskflow
//! # or explicitly
//! taskflow ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `a`: Add task (title, priority, category, due date, repeat rule)
//! *   `Space`: Toggle done
//! *   `x`: Select for bulk delete, `D`: delete selected
//! *   `d`: Delete task (or category, in the Categories view)
//! *   `e`: Edit title, `t`: Edit due date
//! *   `Tab`: Switch between Active and Completed
//! *   `/`: Search as you type
//! *   `f`: Cycle the category filter, `F` clears filters
//! *   `v`: Switch to Categories view, `Enter` there shows that category's tasks
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! taskflow add "Pay rent" --priority high --category Home --due 2025-07-01
//!
//! # Every Monday and Thursday until the end of June
//! taskflow add "Gym" --recur weekly --days mon,thu --end 2025-06-30
//!
//! # Second Tuesday of every month
//! taskflow add "Book club" --recur monthly --monthly-type day --start 2025-01-14
//!
//! taskflow list --category work
//! taskflow search milk
//! taskflow toggle 3
//! taskflow remove 4 5 6
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory
//! (`~/.local/share/taskflow/tasks.json` on Linux), categories next to
//! them. Override with `--db`, the `TASKFLOW_DB` environment variable, or
//! `[storage] path` in `~/.config/taskflow/config.toml`.

use std::io;
use std::process::ExitCode;

use chrono::{Datelike, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use taskflow::commands::*;
use taskflow::config::{Config, GlobalArgs};
use taskflow::logging::init_logging;
use taskflow::models::{Priority, TaskPatch};
use taskflow::recurrence::{parse_date, parse_days, CustomUnit, MonthlyType, Pattern, RecurringRule};
use taskflow::storage::JsonFileStore;
use taskflow::tui::run_tui;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Terminal to-do list with recurring tasks", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,
        /// Category, e.g. Work
        #[arg(short, long)]
        category: Option<String>,
        /// Due date in YYYY-MM-DD
        #[arg(short, long, value_parser = parse_date_arg)]
        due: Option<NaiveDate>,
        #[command(flatten)]
        repeat: RepeatArgs,
    },
    /// List tasks
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
        /// Show completed tasks instead of active ones
        #[arg(long)]
        completed: bool,
    },
    /// Find tasks by title or category
    Search {
        query: String,
    },
    /// Mark a task done, or not done again
    Toggle {
        id: u64,
    },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<String>,
        /// New due date in YYYY-MM-DD
        #[arg(short, long, value_parser = parse_date_arg, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Remove one or more tasks
    Remove {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Reset the database (delete all tasks and categories)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

/// Options for generating a recurring series.
#[derive(clap::Args, Debug)]
struct RepeatArgs {
    /// Repeat pattern
    #[arg(short, long, value_enum)]
    recur: Option<Pattern>,
    /// Every N days/weeks/months, or the custom interval
    #[arg(long, default_value_t = 1, requires = "recur")]
    every: u32,
    /// Weekdays for weekly repeats, e.g. mon,wed,fri (default: the start date's weekday)
    #[arg(long, requires = "recur")]
    days: Option<String>,
    /// First date of the series (default: due date, else today)
    #[arg(long, value_parser = parse_date_arg, requires = "recur")]
    start: Option<NaiveDate>,
    /// Last possible date of the series
    #[arg(long, value_parser = parse_date_arg, requires = "recur")]
    end: Option<NaiveDate>,
    /// Monthly repeats: same date, or same weekday of the month
    #[arg(long, value_enum, default_value_t = MonthlyType::Date)]
    monthly_type: MonthlyType,
    /// Unit for custom repeats
    #[arg(long, value_enum, default_value_t = CustomUnit::Days)]
    unit: CustomUnit,
}

impl RepeatArgs {
    fn to_rule(&self, due: Option<NaiveDate>) -> Result<Option<RecurringRule>, taskflow::error::RuleError> {
        let Some(pattern) = self.recur else {
            return Ok(None);
        };
        let start = self.start.or(due).unwrap_or_else(|| Local::now().date_naive());
        let mut rule = match pattern {
            Pattern::Custom => RecurringRule::custom(start, self.every, self.unit),
            Pattern::Monthly => RecurringRule::monthly(start, self.monthly_type).every(self.every),
            other => RecurringRule::new(other, start).every(self.every),
        };
        match &self.days {
            Some(days) => rule.selected_days = parse_days(days)?,
            // A plain `--recur weekly` repeats on the start date's weekday.
            None if pattern == Pattern::Weekly => {
                rule.selected_days.insert(start.weekday().into());
            }
            None => {}
        }
        rule.end_date = self.end;
        Ok(Some(rule))
    }
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Add a new category
    Add {
        name: String,
        /// Hex colour, e.g. #10b981
        #[arg(long)]
        color: Option<String>,
    },
    /// List categories with active task counts
    List,
    /// Remove a category; its tasks move to the default category
    Remove {
        name: String,
    },
    /// Rename or recolour a category
    Edit {
        name: String,
        /// New name
        #[arg(short, long)]
        rename: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.global) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            Config::load(&GlobalArgs { config: None, ..cli.global.clone() }).unwrap_or_default()
        }
    };
    let _log_guard = init_logging(&config.log_level, &config.log_file);
    tracing::debug!(db = %config.tasks_path.display(), "taskflow starting");

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Option<Commands>, config: &Config) -> taskflow::Result<()> {
    if let Some(Commands::Completions { shell }) = &command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "taskflow", &mut io::stdout());
        return Ok(());
    }

    let mut store = JsonFileStore::open(&config.tasks_path)?;

    match command {
        Some(Commands::Add { title, priority, category, due, repeat }) => {
            let req = AddRequest {
                title,
                priority: priority.unwrap_or(config.default_priority),
                category: category.unwrap_or_else(|| config.default_category.clone()),
                due_date: due,
                recurring: repeat.to_rule(due)?,
            };
            cmd_add(&mut store, req, &config.limits, false).map(drop)
        }
        Some(Commands::List { category, completed }) => cmd_list(&store, category, completed),
        Some(Commands::Search { query }) => cmd_search(&store, &query),
        Some(Commands::Toggle { id }) => cmd_toggle(&mut store, id, false).map(drop),
        Some(Commands::Edit { id, title, priority, category, due, clear_due }) => {
            let due_date = if clear_due { Some(None) } else { due.map(Some) };
            let patch = TaskPatch { title, completed: None, priority, category, due_date };
            cmd_edit(&mut store, id, patch, false).map(drop)
        }
        Some(Commands::Remove { ids }) => cmd_remove(&mut store, &ids, false).map(drop),
        Some(Commands::Category { command }) => match command {
            CategoryCommands::Add { name, color } => cmd_category_add(&mut store, &name, color.as_deref(), false),
            CategoryCommands::List => cmd_category_list(&store),
            CategoryCommands::Remove { name } => {
                cmd_category_remove(&mut store, &name, &config.default_category, false)
            }
            CategoryCommands::Edit { name, rename, color } => {
                cmd_category_edit(&mut store, &name, rename, color, false)
            }
        },
        Some(Commands::Reset { force }) => cmd_reset(&mut store, force),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => run_tui(Box::new(store), config.clone()),
    }
}
