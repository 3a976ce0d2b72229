use std::io::{self, Write};

use chrono::{Local, NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::due::{due_label, DueStatus};
use crate::error::{Error, Result, StoreError};
use crate::models::{category_key, same_category, Category, CategoryPatch, NewTask, Priority, Task, TaskFilter, TaskPatch};
use crate::recurrence::{expand, ExpansionLimits, RecurringRule, TaskTemplate};
use crate::storage::{active_counts, BatchCreated, Store};

/// What the user filled in on the add form.
#[derive(Debug, Clone, PartialEq)]
pub struct AddRequest {
    pub title: String,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    /// When set, the task is expanded into a dated series.
    pub recurring: Option<RecurringRule>,
}

/// Result of adding a task: one record, or a recurring batch.
#[derive(Debug)]
pub enum Created {
    Single(Task),
    Batch(BatchCreated),
}

impl Created {
    /// Tasks that were actually created.
    pub fn tasks(&self) -> &[Task] {
        match self {
            Created::Single(t) => std::slice::from_ref(t),
            Created::Batch(b) => &b.created,
        }
    }

    /// One-line notification for the user.
    pub fn summary(&self) -> String {
        match self {
            Created::Single(t) => format!("Task added (id = {})", t.id),
            Created::Batch(b) if b.created.is_empty() => "No recurring tasks matched that schedule".to_string(),
            Created::Batch(b) if b.rejected.is_empty() => {
                format!("{} recurring tasks created!", b.created.len())
            }
            Created::Batch(b) => format!(
                "{} recurring tasks created, {} rejected",
                b.created.len(),
                b.rejected.len()
            ),
        }
    }
}

/// Adds a task, or a whole recurring series when the request carries a rule.
///
/// A recurring request is expanded once and handed to the store in a
/// single `create_many` call. If the category is not known yet it is
/// created once at least one task has been stored, much like naming a new
/// project.
pub fn cmd_add(store: &mut dyn Store, req: AddRequest, limits: &ExpansionLimits, silent: bool) -> Result<Created> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(StoreError::EmptyTitle.into());
    }
    let category = req.category.trim().to_string();
    if let Some(rule) = &req.recurring {
        rule.validate()?;
    }

    let created = match &req.recurring {
        None => {
            let task = NewTask::new(title)
                .with_priority(req.priority)
                .with_category(category.clone())
                .with_due_date(req.due_date);
            Created::Single(store.create_one(task)?)
        }
        Some(rule) => {
            let template = TaskTemplate { title, priority: req.priority, category: category.clone() };
            let expansion = expand(&template, rule, limits);
            if expansion.stop.is_truncated() && !silent {
                println!(
                    "Note: stopped after {} tasks; set an end date to control the series length.",
                    expansion.len()
                );
            }
            let batch = if expansion.is_empty() {
                BatchCreated::default()
            } else {
                store.create_many(expansion.to_new_tasks(Utc::now()))?
            };
            for r in &batch.rejected {
                tracing::warn!(index = r.index, reason = %r.reason, "recurring task rejected");
            }
            Created::Batch(batch)
        }
    };

    if !created.tasks().is_empty() {
        ensure_category(store, &category, silent)?;
    }

    tracing::info!(count = created.tasks().len(), "added tasks");
    if !silent {
        println!("{}", created.summary());
    }
    Ok(created)
}

fn ensure_category(store: &mut dyn Store, name: &str, silent: bool) -> Result<()> {
    if name.trim().is_empty() {
        return Ok(());
    }
    let exists = store.categories()?.iter().any(|c| same_category(&c.name, name));
    if !exists {
        store.create_category(name, None)?;
        if !silent { println!("Category '{}' not found. Creating it.", name.trim()); }
    }
    Ok(())
}

/// Flips a task between done and not done.
pub fn cmd_toggle(store: &mut dyn Store, id: u64, silent: bool) -> Result<Task> {
    let task = store.get(id)?.ok_or(StoreError::TaskNotFound(id))?;
    let updated = store.update(id, TaskPatch { completed: Some(!task.completed), ..Default::default() })?;
    if !silent {
        if updated.completed {
            println!("Task {id} completed! 🎉");
        } else {
            println!("Task {id} marked as incomplete.");
        }
    }
    Ok(updated)
}

/// Edits an existing task's details.
pub fn cmd_edit(store: &mut dyn Store, id: u64, mut patch: TaskPatch, silent: bool) -> Result<Task> {
    if patch.is_empty() {
        return Err(Error::EmptyPatch);
    }
    let recategorized = match patch.category.as_mut() {
        Some(c) => {
            *c = c.trim().to_string();
            true
        }
        None => false,
    };
    let updated = store.update(id, patch)?;
    if recategorized {
        ensure_category(store, &updated.category, silent)?;
    }
    if !silent { println!("Task {id} updated."); }
    Ok(updated)
}

/// Removes one task, or several at once.
///
/// A single id that does not exist is an error. For several ids the ones
/// that were found are removed and the rest are reported.
pub fn cmd_remove(store: &mut dyn Store, ids: &[u64], silent: bool) -> Result<Vec<u64>> {
    match ids {
        [] => Ok(Vec::new()),
        [id] => {
            if !store.delete(*id)? {
                return Err(StoreError::TaskNotFound(*id).into());
            }
            if !silent { println!("Task {id} removed."); }
            Ok(vec![*id])
        }
        _ => {
            let removed = store.delete_many(ids)?;
            if !silent {
                println!("{} tasks deleted.", removed.len());
                let missing: Vec<String> = ids
                    .iter()
                    .filter(|id| !removed.contains(*id))
                    .map(u64::to_string)
                    .collect();
                if !missing.is_empty() {
                    eprintln!("Not found: {}", missing.join(", "));
                }
            }
            Ok(removed)
        }
    }
}

/// Lists tasks in a formatted table, in their stored order.
///
/// Shows active tasks unless `completed` is set, optionally restricted to
/// one category.
pub fn cmd_list(store: &dyn Store, category: Option<String>, completed: bool) -> Result<()> {
    let scope = TaskFilter { category: category.clone(), completed: None };
    let all = store.list(&scope)?;
    let (done, active): (Vec<Task>, Vec<Task>) = all.into_iter().partition(|t| t.completed);

    let title = match &category {
        Some(c) => capitalize(c),
        None => "All Tasks".to_string(),
    };
    println!("{title}: {} active, {} completed", active.len(), done.len());

    let shown = if completed { done } else { active };
    if shown.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", task_table(&shown));
    Ok(())
}

/// Prints tasks whose title or category contains `query`.
pub fn cmd_search(store: &dyn Store, query: &str) -> Result<()> {
    let tasks = store.search(query)?;
    println!("Search results for \"{}\"", query.trim());
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", task_table(&tasks));
    Ok(())
}

fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Category").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Repeats").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    let today = Local::now().date_naive();

    for t in tasks {
        let priority_color = match t.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };

        let (due_str, due_color) = match t.due_date {
            Some(d) => {
                let color = match DueStatus::classify(d, today) {
                    _ if t.completed => Color::Reset,
                    DueStatus::Overdue => Color::Red,
                    DueStatus::Today => Color::Yellow,
                    DueStatus::Tomorrow => Color::Blue,
                    DueStatus::Future => Color::Reset,
                };
                (format!("{} ({})", d, due_label(d, today)), color)
            }
            None => (String::new(), Color::Reset),
        };

        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.priority).fg(priority_color),
            Cell::new(&t.category),
            Cell::new(due_str).fg(due_color),
            Cell::new(t.recurring.as_ref().map(RecurringRule::describe).unwrap_or_default()),
            Cell::new(status).fg(status_color),
        ]);
    }
    table
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Adds a new category.
pub fn cmd_category_add(store: &mut dyn Store, name: &str, color: Option<&str>, silent: bool) -> Result<()> {
    let c = store.create_category(name, color)?;
    if !silent { println!("Category '{}' added.", c.name); }
    Ok(())
}

/// Lists categories with their active task counts.
pub fn cmd_category_list(store: &dyn Store) -> Result<()> {
    let categories = store.categories()?;
    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }
    let counts = active_counts(&store.list(&TaskFilter::default())?);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Name", "Color", "Active Tasks"]);
    for c in categories {
        let count = counts.get(&category_key(&c.name)).copied().unwrap_or(0);
        table.add_row(vec![c.name, c.color, count.to_string()]);
    }
    println!("{table}");
    Ok(())
}

/// Renames or recolours a category. Tasks follow a rename.
pub fn cmd_category_edit(
    store: &mut dyn Store,
    name: &str,
    new_name: Option<String>,
    color: Option<String>,
    silent: bool,
) -> Result<()> {
    let category = find_category(store, name)?;
    let renamed_to = new_name.clone();
    store.update_category(category.id, CategoryPatch { name: new_name, color })?;

    if let Some(new_name) = renamed_to {
        retag_tasks(store, &category.name, &new_name)?;
    }
    if !silent { println!("Category '{}' updated.", category.name); }
    Ok(())
}

/// Removes a category and moves its tasks to `fallback`, which is created
/// if needed. The fallback itself cannot be removed.
pub fn cmd_category_remove(store: &mut dyn Store, name: &str, fallback: &str, silent: bool) -> Result<()> {
    let fallback = fallback.trim();
    if same_category(name, fallback) {
        return Err(Error::DefaultCategory(fallback.to_string()));
    }
    let category = find_category(store, name)?;
    ensure_category(store, fallback, silent)?;
    store.delete_category(category.id)?;
    let moved = retag_tasks(store, &category.name, fallback)?;
    if !silent {
        println!("Category '{}' removed.", category.name);
        if moved > 0 {
            println!("{moved} tasks moved to '{fallback}'.");
        }
    }
    Ok(())
}

fn find_category(store: &dyn Store, name: &str) -> Result<Category> {
    store
        .categories()?
        .into_iter()
        .find(|c| same_category(&c.name, name))
        .ok_or_else(|| Error::UnknownCategory(name.trim().to_string()))
}

fn retag_tasks(store: &mut dyn Store, from: &str, to: &str) -> Result<usize> {
    let tasks = store.list(&TaskFilter::category(from))?;
    for t in &tasks {
        store.update(t.id, TaskPatch { category: Some(to.to_string()), ..Default::default() })?;
    }
    Ok(tasks.len())
}

/// Resets the database by deleting all tasks and categories.
pub fn cmd_reset(store: &mut dyn Store, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all tasks and categories? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.clear()?;
    tracing::info!("database reset");
    println!("Database reset successfully.");
    Ok(())
}
