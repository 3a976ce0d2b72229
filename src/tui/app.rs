use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::{cmd_add, cmd_category_remove, cmd_edit, cmd_remove, cmd_toggle, AddRequest};
use crate::config::Config;
use crate::error::Result;
use crate::models::{same_category, Category, Priority, Task, TaskFilter, TaskPatch};
use crate::recurrence::{parse_date, parse_rule};
use crate::storage::{active_counts, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Adding,
    Editing,
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Tasks,
    Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    Title,
    Due,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Debug, Default)]
pub struct AddState {
    pub title: String,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due: Option<NaiveDate>,
    pub step: usize, // 0: Title, 1: Priority, 2: Category, 3: Due, 4: Repeat
}

pub struct App {
    store: Box<dyn Store>,
    config: Config,
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    /// Active task count per category key.
    pub counts: BTreeMap<String, usize>,
    pub state: TableState,
    pub category_state: TableState,
    pub view_mode: ViewMode,
    pub tab: Tab,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<u64>,
    pub add_state: AddState,
    pub search: String,
    pub category_filter: Option<String>,
    /// Ids marked for bulk delete.
    pub marked: BTreeSet<u64>,
    /// Last notification shown in the status line.
    pub status: Option<String>,
}

impl App {
    /// Creates the app around an owned store and loads initial data.
    pub fn new(store: Box<dyn Store>, config: Config) -> App {
        let mut app = App {
            store,
            config,
            tasks: Vec::new(),
            categories: Vec::new(),
            counts: BTreeMap::new(),
            state: TableState::default(),
            category_state: TableState::default(),
            view_mode: ViewMode::Tasks,
            tab: Tab::Active,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            search: String::new(),
            category_filter: None,
            marked: BTreeSet::new(),
            status: None,
        };
        app.reload();
        app
    }

    /// Shows the outcome of an action in the status line.
    fn report<T>(&mut self, result: Result<T>, ok: impl FnOnce(&T) -> String) {
        self.status = Some(match &result {
            Ok(v) => ok(v),
            Err(e) => {
                tracing::warn!(error = %e, "tui action failed");
                format!("Error: {e}")
            }
        });
    }

    /// Reloads tasks and categories from the store.
    pub fn reload(&mut self) {
        if let Err(e) = self.try_reload() {
            tracing::error!(error = %e, "reload failed");
            self.status = Some(format!("Error: {e}"));
        }
    }

    fn try_reload(&mut self) -> Result<()> {
        let all = self.store.list(&TaskFilter::default())?;
        self.counts = active_counts(&all);

        let base = if self.search.trim().is_empty() { all } else { self.store.search(&self.search)? };
        let filter = TaskFilter {
            category: self.category_filter.clone(),
            completed: Some(self.tab == Tab::Completed),
        };
        self.tasks = base.into_iter().filter(|t| filter.matches(t)).collect();
        self.marked.retain(|id| self.tasks.iter().any(|t| t.id == *id));
        self.categories = self.store.categories()?;

        clamp_selection(&mut self.state, self.tasks.len());
        clamp_selection(&mut self.category_state, self.categories.len());
        Ok(())
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn current_list(&mut self) -> (&mut TableState, usize) {
        match self.view_mode {
            ViewMode::Tasks => (&mut self.state, self.tasks.len()),
            ViewMode::Categories => (&mut self.category_state, self.categories.len()),
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks.get(i))
    }

    fn selected_category(&self) -> Option<&Category> {
        self.category_state.selected().and_then(|i| self.categories.get(i))
    }

    /// Flips the selected task between done and not done.
    pub fn toggle_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        let Some(id) = self.selected_task().map(|t| t.id) else { return };
        let result = cmd_toggle(self.store.as_mut(), id, true);
        self.report(result, |t| {
            if t.completed { format!("'{}' completed", t.title) } else { format!("'{}' reopened", t.title) }
        });
        self.reload();
    }

    /// Deletes the selected task, or the selected category in the categories view.
    pub fn delete_selected(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => {
                let Some(id) = self.selected_task().map(|t| t.id) else { return };
                let result = cmd_remove(self.store.as_mut(), &[id], true);
                self.report(result, |_| "Task deleted".to_string());
            }
            ViewMode::Categories => {
                let Some(name) = self.selected_category().map(|c| c.name.clone()) else { return };
                let fallback = self.config.default_category.clone();
                let result = cmd_category_remove(self.store.as_mut(), &name, &fallback, true);
                self.report(result, |_| format!("Category '{name}' removed, tasks moved to '{fallback}'"));
                if self.category_filter.as_deref().is_some_and(|f| same_category(f, &name)) {
                    self.category_filter = None;
                }
            }
        }
        self.reload();
    }

    /// Marks or unmarks the selected task for bulk delete.
    pub fn toggle_mark(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else { return };
        if !self.marked.remove(&id) {
            self.marked.insert(id);
        }
    }

    /// Deletes every marked task in one go.
    pub fn delete_marked(&mut self) {
        if self.marked.is_empty() {
            self.status = Some("Nothing selected".to_string());
            return;
        }
        let ids: Vec<u64> = self.marked.iter().copied().collect();
        let result = cmd_remove(self.store.as_mut(), &ids, true);
        self.report(result, |removed| format!("{} tasks deleted", removed.len()));
        self.marked.clear();
        self.reload();
    }

    /// Switches between the Active and Completed tabs.
    pub fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Active => Tab::Completed,
            Tab::Completed => Tab::Active,
        };
        self.state.select(None);
        self.reload();
    }

    /// Toggles between the task table and the categories view.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Categories,
            ViewMode::Categories => ViewMode::Tasks,
        };
    }

    /// Filters by the next category, wrapping back to "all".
    pub fn cycle_category_filter(&mut self) {
        let next = match &self.category_filter {
            None => self.categories.first(),
            Some(current) => self
                .categories
                .iter()
                .skip_while(|c| !same_category(&c.name, current))
                .nth(1),
        };
        self.category_filter = next.map(|c| c.name.clone());
        self.reload();
    }

    /// In the categories view, shows only the selected category's tasks.
    pub fn filter_by_selected_category(&mut self) {
        if let Some(name) = self.selected_category().map(|c| c.name.clone()) {
            self.category_filter = Some(name);
            self.view_mode = ViewMode::Tasks;
            self.reload();
        }
    }

    pub fn clear_filters(&mut self) {
        self.category_filter = None;
        self.search.clear();
        self.reload();
    }

    pub fn start_search(&mut self) {
        self.view_mode = ViewMode::Tasks;
        self.input_mode = InputMode::Searching;
        self.input_buffer = self.search.clone();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of a specific field for the selected task.
    pub fn start_edit(&mut self, field: InputField) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        let Some(t) = self.selected_task() else { return };
        let id = t.id;
        let buffer = match field {
            InputField::Title => t.title.clone(),
            InputField::Due => t.due_date.map(|d| d.to_string()).unwrap_or_default(),
            InputField::None => String::new(),
        };
        self.target_id = Some(id);
        self.input_field = field;
        self.input_buffer = buffer;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        if self.input_mode == InputMode::Searching {
            self.search.clear();
            self.reload();
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn push_char(&mut self, c: char) {
        self.input_buffer.push(c);
        if self.input_mode == InputMode::Searching {
            self.search = self.input_buffer.clone();
            self.reload();
        }
    }

    pub fn pop_char(&mut self) {
        self.input_buffer.pop();
        if self.input_mode == InputMode::Searching {
            self.search = self.input_buffer.clone();
            self.reload();
        }
    }

    /// Handles Enter based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Searching => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            InputMode::Normal => {}
        }
    }

    /// Handles input for the "Add Task" wizard. A bad value keeps the
    /// wizard on the same step and explains why in the status line.
    fn handle_adding_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        match self.add_state.step {
            0 => { // Title
                if input.is_empty() {
                    return;
                }
                self.add_state.title = input;
            }
            1 => { // Priority
                if !input.is_empty() {
                    match input.parse::<Priority>() {
                        Ok(p) => self.add_state.priority = Some(p),
                        Err(e) => {
                            self.status = Some(e);
                            return;
                        }
                    }
                }
            }
            2 => { // Category
                if !input.is_empty() {
                    self.add_state.category = Some(input);
                }
            }
            3 => { // Due
                if !input.is_empty() {
                    match parse_date(&input) {
                        Ok(d) => self.add_state.due = Some(d),
                        Err(e) => {
                            self.status = Some(e.to_string());
                            return;
                        }
                    }
                }
            }
            _ => { // Repeat
                let start = self.add_state.due.unwrap_or_else(|| Local::now().date_naive());
                let recurring = if input.is_empty() {
                    None
                } else {
                    match parse_rule(&input, start) {
                        Ok(rule) => Some(rule),
                        Err(e) => {
                            self.status = Some(e.to_string());
                            return;
                        }
                    }
                };
                self.finish_add(recurring);
                return;
            }
        }
        self.add_state.step += 1;
        self.input_buffer.clear();
        self.status = None;
    }

    fn finish_add(&mut self, recurring: Option<crate::recurrence::RecurringRule>) {
        let state = std::mem::take(&mut self.add_state);
        let req = AddRequest {
            title: state.title,
            priority: state.priority.unwrap_or(self.config.default_priority),
            category: state.category.unwrap_or_else(|| self.config.default_category.clone()),
            due_date: state.due,
            recurring,
        };
        let result = cmd_add(self.store.as_mut(), req, &self.config.limits, true);
        self.report(result, |created| created.summary());
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.reload();
    }

    /// Handles input for the "Edit Task" mode.
    fn handle_editing_input(&mut self) {
        let Some(id) = self.target_id else { return };
        let input = self.input_buffer.trim().to_string();
        let patch = match self.input_field {
            InputField::Title => TaskPatch { title: Some(input), ..Default::default() },
            InputField::Due if input.is_empty() => TaskPatch { due_date: Some(None), ..Default::default() },
            InputField::Due => match parse_date(&input) {
                Ok(d) => TaskPatch { due_date: Some(Some(d)), ..Default::default() },
                Err(e) => {
                    self.status = Some(e.to_string());
                    return;
                }
            },
            InputField::None => TaskPatch::default(),
        };
        let result = cmd_edit(self.store.as_mut(), id, patch, true);
        self.report(result, |t| format!("'{}' updated", t.title));
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.reload();
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTask;
    use crate::storage::{MemoryStore, TaskStore};

    fn app_with(titles: &[&str]) -> App {
        let mut store = MemoryStore::new();
        for (i, title) in titles.iter().enumerate() {
            let mut task = NewTask::new(*title);
            task.order = i as i64;
            store.create_one(task).unwrap();
        }
        App::new(Box::new(store), Config::default())
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            app.push_char(c);
        }
        app.handle_input();
    }

    #[test]
    fn add_wizard_creates_single_task() {
        let mut app = app_with(&[]);
        app.start_add();
        type_line(&mut app, "Buy milk");
        type_line(&mut app, "high");
        type_line(&mut app, "Errands");
        type_line(&mut app, "");
        type_line(&mut app, "");

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].priority, Priority::High);
        assert_eq!(app.tasks[0].category, "Errands");
        assert_eq!(app.status.as_deref(), Some("Task added (id = 1)"));
        assert!(app.categories.iter().any(|c| c.name == "Errands"));
    }

    #[test]
    fn add_wizard_expands_recurring_rule() {
        let mut app = app_with(&[]);
        app.start_add();
        type_line(&mut app, "Standup");
        type_line(&mut app, "");
        type_line(&mut app, "");
        type_line(&mut app, "2025-03-03");
        type_line(&mut app, "daily until 2025-03-07");

        assert_eq!(app.tasks.len(), 5);
        assert_eq!(app.status.as_deref(), Some("5 recurring tasks created!"));
        assert!(app.tasks.iter().all(|t| t.category == "Personal"));
    }

    #[test]
    fn bad_due_date_keeps_wizard_on_step() {
        let mut app = app_with(&[]);
        app.start_add();
        type_line(&mut app, "Call mum");
        type_line(&mut app, "");
        type_line(&mut app, "");
        type_line(&mut app, "next tuesday");

        assert_eq!(app.input_mode, InputMode::Adding);
        assert_eq!(app.add_state.step, 3);
        assert!(app.status.is_some());
    }

    #[test]
    fn toggle_moves_task_to_completed_tab() {
        let mut app = app_with(&["a", "b"]);
        app.toggle_selected();
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].title, "b");

        app.switch_tab();
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].title, "a");
        assert!(app.tasks[0].completed);
    }

    #[test]
    fn bulk_delete_marked_tasks() {
        let mut app = app_with(&["a", "b", "c"]);
        app.toggle_mark();
        app.next();
        app.next();
        app.toggle_mark();
        app.delete_marked();

        let titles: Vec<&str> = app.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["b"]);
        assert_eq!(app.status.as_deref(), Some("2 tasks deleted"));
        assert!(app.marked.is_empty());
    }

    #[test]
    fn search_filters_live_and_escape_clears() {
        let mut app = app_with(&["Buy milk", "Walk dog", "Milk the cow"]);
        app.start_search();
        for c in "MILK".chars() {
            app.push_char(c);
        }
        assert_eq!(app.tasks.len(), 2);

        app.cancel_input();
        assert_eq!(app.tasks.len(), 3);
        assert!(app.search.is_empty());
    }

    #[test]
    fn navigation_wraps() {
        let mut app = app_with(&["a", "b"]);
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn edit_clears_due_date() {
        let mut store = MemoryStore::new();
        store
            .create_one(NewTask::new("Pay rent").with_due_date(NaiveDate::from_ymd_opt(2025, 7, 1)))
            .unwrap();
        let mut app = App::new(Box::new(store), Config::default());

        app.start_edit(InputField::Due);
        assert_eq!(app.input_buffer, "2025-07-01");
        app.input_buffer.clear();
        app.handle_input();

        assert_eq!(app.tasks[0].due_date, None);
    }
}
