use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::models::{Category, CategoryPatch, NewTask, Task, TaskFilter, TaskPatch};

use super::{BatchCreated, CategoryStore, Records, TaskStore};

/// Persists tasks to `tasks.json` and categories to a sibling
/// `categories.json`, rewriting the whole file on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    tasks_path: PathBuf,
    categories_path: PathBuf,
}

impl JsonFileStore {
    /// Opens a store backed by `tasks_path`. The parent directory is created
    /// if needed; the files themselves appear on first write.
    pub fn open(tasks_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let tasks_path = tasks_path.into();
        if let Some(dir) = tasks_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
        }
        let mut categories_path = tasks_path.clone();
        categories_path.set_file_name("categories.json");
        tracing::debug!(path = %tasks_path.display(), "opened json store");
        Ok(JsonFileStore { tasks_path, categories_path })
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn categories_path(&self) -> &Path {
        &self.categories_path
    }

    fn load(&self) -> Result<Records, StoreError> {
        Ok(Records {
            tasks: read_json(&self.tasks_path)?,
            categories: read_json(&self.categories_path)?,
        })
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        write_json(&self.tasks_path, tasks)
    }

    fn save_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        write_json(&self.categories_path, categories)
    }

    /// Loads, applies `f` and writes tasks back when `f` reports a change.
    fn with_tasks<R>(&mut self, f: impl FnOnce(&mut Records) -> Result<(R, bool), StoreError>) -> Result<R, StoreError> {
        let mut records = self.load()?;
        let (out, changed) = f(&mut records)?;
        if changed {
            self.save_tasks(&records.tasks)?;
        }
        Ok(out)
    }
}

/// A missing file reads as an empty list.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    };
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&s).map_err(|source| StoreError::Corrupt { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let s = serde_json::to_string_pretty(items)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    f.write_all(s.as_bytes())
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    tracing::trace!(path = %path.display(), count = items.len(), "wrote records");
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
    }
}

impl TaskStore for JsonFileStore {
    fn create_one(&mut self, task: NewTask) -> Result<Task, StoreError> {
        self.with_tasks(|r| r.create_one(task).map(|t| (t, true)))
    }

    fn create_many(&mut self, tasks: Vec<NewTask>) -> Result<BatchCreated, StoreError> {
        self.with_tasks(|r| {
            let out = r.create_many(tasks);
            let changed = !out.created.is_empty();
            Ok((out, changed))
        })
    }

    fn get(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self.load()?.get(id))
    }

    fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task, StoreError> {
        self.with_tasks(|r| r.update(id, patch).map(|t| (t, true)))
    }

    fn delete(&mut self, id: u64) -> Result<bool, StoreError> {
        self.with_tasks(|r| {
            let removed = r.delete(id);
            Ok((removed, removed))
        })
    }

    fn delete_many(&mut self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        self.with_tasks(|r| {
            let removed = r.delete_many(ids);
            let changed = !removed.is_empty();
            Ok((removed, changed))
        })
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        Ok(self.load()?.list(filter))
    }

    fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self.load()?.search(query))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        remove_if_exists(&self.tasks_path)?;
        remove_if_exists(&self.categories_path)
    }
}

impl CategoryStore for JsonFileStore {
    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        read_json(&self.categories_path)
    }

    fn create_category(&mut self, name: &str, color: Option<&str>) -> Result<Category, StoreError> {
        let mut records = self.load()?;
        let c = records.create_category(name, color)?;
        self.save_categories(&records.categories)?;
        Ok(c)
    }

    fn update_category(&mut self, id: u64, patch: CategoryPatch) -> Result<Category, StoreError> {
        let mut records = self.load()?;
        let c = records.update_category(id, patch)?;
        self.save_categories(&records.categories)?;
        Ok(c)
    }

    fn delete_category(&mut self, id: u64) -> Result<bool, StoreError> {
        let mut records = self.load()?;
        let removed = records.delete_category(id);
        if removed {
            self.save_categories(&records.categories)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        assert!(store.list(&TaskFilter::default()).unwrap().is_empty());
        assert!(store.categories().unwrap().is_empty());
    }

    #[test]
    fn creates_nested_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("tasks.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.create_one(NewTask::new("nested")).unwrap();
        assert!(path.exists());
        assert_eq!(store.categories_path(), dir.path().join("a").join("b").join("categories.json"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(store.list(&TaskFilter::default()), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn clear_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("tasks.json")).unwrap();
        store.create_one(NewTask::new("a")).unwrap();
        store.create_category("Work", None).unwrap();
        store.clear().unwrap();
        assert!(!store.tasks_path().exists());
        assert!(!store.categories_path().exists());
        // Clearing twice is fine.
        store.clear().unwrap();
    }
}
