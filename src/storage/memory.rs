use crate::error::StoreError;
use crate::models::{Category, CategoryPatch, NewTask, Task, TaskFilter, TaskPatch};

use super::{BatchCreated, CategoryStore, Records, TaskStore};

/// Keeps everything in memory; nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Records,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryStore {
    fn create_one(&mut self, task: NewTask) -> Result<Task, StoreError> {
        self.records.create_one(task)
    }

    fn create_many(&mut self, tasks: Vec<NewTask>) -> Result<BatchCreated, StoreError> {
        Ok(self.records.create_many(tasks))
    }

    fn get(&self, id: u64) -> Result<Option<Task>, StoreError> {
        Ok(self.records.get(id))
    }

    fn update(&mut self, id: u64, patch: TaskPatch) -> Result<Task, StoreError> {
        self.records.update(id, patch)
    }

    fn delete(&mut self, id: u64) -> Result<bool, StoreError> {
        Ok(self.records.delete(id))
    }

    fn delete_many(&mut self, ids: &[u64]) -> Result<Vec<u64>, StoreError> {
        Ok(self.records.delete_many(ids))
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        Ok(self.records.list(filter))
    }

    fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self.records.search(query))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records = Records::default();
        Ok(())
    }
}

impl CategoryStore for MemoryStore {
    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.records.categories.clone())
    }

    fn create_category(&mut self, name: &str, color: Option<&str>) -> Result<Category, StoreError> {
        self.records.create_category(name, color)
    }

    fn update_category(&mut self, id: u64, patch: CategoryPatch) -> Result<Category, StoreError> {
        self.records.update_category(id, patch)
    }

    fn delete_category(&mut self, id: u64) -> Result<bool, StoreError> {
        Ok(self.records.delete_category(id))
    }
}
