//! Task and category persistence.
//!
//! Stores are plain owned values handed to whoever needs them: the CLI
//! builds one per invocation, the TUI keeps one for its lifetime, tests use
//! [`MemoryStore`]. Both implementations share the record logic in
//! [`Records`], so they behave identically apart from where the bytes live.

mod json_file;
mod memory;

use std::collections::BTreeMap;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{
    category_key, same_category, Category, CategoryPatch, NewTask, SeriesLink, Task, TaskFilter, TaskPatch,
    DEFAULT_CATEGORY_COLOR,
};

/// CRUD over task records.
pub trait TaskStore {
    /// Creates a single task and returns it with its assigned id.
    fn create_one(&mut self, task: NewTask) -> Result<Task, StoreError>;

    /// Creates every valid task in `tasks`, in order.
    ///
    /// Invalid records are skipped and reported in
    /// [`BatchCreated::rejected`]; the rest are still created.
    fn create_many(&mut self, tasks: Vec<NewTask>) -> Result<BatchCreated, StoreError>;

    fn get(&self, id: u64) -> Result<Option<Task>, StoreError>;

    /// Applies `patch` to task `id` and returns the updated record.
    fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task, StoreError>;

    /// Returns whether anything was removed.
    fn delete(&mut self, id: u64) -> Result<bool, StoreError>;

    /// Returns the ids that were actually removed.
    fn delete_many(&mut self, ids: &[u64]) -> Result<Vec<u64>, StoreError>;

    /// Tasks matching `filter`, ordered by their sort key.
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Case-insensitive substring match on title or category.
    /// A blank query returns everything.
    fn search(&self, query: &str) -> Result<Vec<Task>, StoreError>;

    /// Removes every task and category.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// CRUD over categories.
pub trait CategoryStore {
    fn categories(&self) -> Result<Vec<Category>, StoreError>;

    fn create_category(&mut self, name: &str, color: Option<&str>) -> Result<Category, StoreError>;

    fn update_category(&mut self, id: u64, patch: CategoryPatch) -> Result<Category, StoreError>;

    fn delete_category(&mut self, id: u64) -> Result<bool, StoreError>;
}

/// Everything the command layer needs from a backend.
pub trait Store: TaskStore + CategoryStore {}

impl<T: TaskStore + CategoryStore> Store for T {}

/// A record that `create_many` refused.
#[derive(Debug)]
pub struct Rejected {
    /// Position in the submitted batch.
    pub index: usize,
    pub title: String,
    pub reason: StoreError,
}

/// Outcome of a batch create. Partial success is still success.
#[derive(Debug, Default)]
pub struct BatchCreated {
    pub created: Vec<Task>,
    pub rejected: Vec<Rejected>,
}

impl BatchCreated {
    pub fn is_partial(&self) -> bool {
        !self.rejected.is_empty() && !self.created.is_empty()
    }
}

/// Number of incomplete tasks per category, keyed by [`category_key`].
pub fn active_counts(tasks: &[Task]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for t in tasks.iter().filter(|t| !t.completed) {
        *counts.entry(category_key(&t.category)).or_insert(0) += 1;
    }
    counts
}

/// The in-memory record set both stores operate on.
#[derive(Debug, Default, Clone)]
pub(crate) struct Records {
    pub(crate) tasks: Vec<Task>,
    pub(crate) categories: Vec<Category>,
}

impl Records {
    fn next_task_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn next_category_id(&self) -> u64 {
        self.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    pub(crate) fn create_one(&mut self, task: NewTask) -> Result<Task, StoreError> {
        if task.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let t = task.into_task(self.next_task_id(), None);
        self.tasks.push(t.clone());
        Ok(t)
    }

    pub(crate) fn create_many(&mut self, tasks: Vec<NewTask>) -> BatchCreated {
        let mut out = BatchCreated::default();
        let mut root_id = None;
        for (index, task) in tasks.into_iter().enumerate() {
            if task.title.trim().is_empty() {
                tracing::warn!(index, "rejected task with empty title");
                out.rejected.push(Rejected { index, title: task.title, reason: StoreError::EmptyTitle });
                continue;
            }
            let id = self.next_task_id();
            // Members whose root was rejected stay unlinked.
            let parent = match task.series {
                Some(SeriesLink::Root) => {
                    root_id = Some(id);
                    None
                }
                Some(SeriesLink::Member) => root_id,
                None => None,
            };
            let t = task.into_task(id, parent);
            self.tasks.push(t.clone());
            out.created.push(t);
        }
        out
    }

    pub(crate) fn get(&self, id: u64) -> Option<Task> {
        self.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub(crate) fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task, StoreError> {
        if patch.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err(StoreError::EmptyTitle);
        }
        let t = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TaskNotFound(id))?;
        patch.apply(t);
        Ok(t.clone())
    }

    pub(crate) fn delete(&mut self, id: u64) -> bool {
        let len_before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != len_before
    }

    pub(crate) fn delete_many(&mut self, ids: &[u64]) -> Vec<u64> {
        let mut removed = Vec::new();
        self.tasks.retain(|t| {
            if ids.contains(&t.id) {
                removed.push(t.id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub(crate) fn list(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
        tasks.sort_by_key(|t| (t.order, t.id));
        tasks
    }

    pub(crate) fn search(&self, query: &str) -> Vec<Task> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list(&TaskFilter::default());
        }
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&needle) || t.category.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.order, t.id));
        tasks
    }

    pub(crate) fn create_category(&mut self, name: &str, color: Option<&str>) -> Result<Category, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if self.categories.iter().any(|c| same_category(&c.name, name)) {
            return Err(StoreError::DuplicateCategory(name.to_string()));
        }
        let c = Category {
            id: self.next_category_id(),
            name: name.to_string(),
            color: color.unwrap_or(DEFAULT_CATEGORY_COLOR).to_string(),
        };
        self.categories.push(c.clone());
        Ok(c)
    }

    pub(crate) fn update_category(&mut self, id: u64, patch: CategoryPatch) -> Result<Category, StoreError> {
        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::EmptyName);
            }
            if self.categories.iter().any(|c| c.id != id && same_category(&c.name, name)) {
                return Err(StoreError::DuplicateCategory(name.to_string()));
            }
        }
        let c = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::CategoryNotFound(id))?;
        if let Some(name) = patch.name { c.name = name.trim().to_string(); }
        if let Some(color) = patch.color { c.color = color; }
        Ok(c.clone())
    }

    pub(crate) fn delete_category(&mut self, id: u64) -> bool {
        let len_before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        self.categories.len() != len_before
    }
}
