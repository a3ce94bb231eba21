// src/store/table.rs

//! Plain, lock-free task table.
//!
//! [`TaskTable`] has no channels and no clock; it only enforces the
//! structural invariants (one record per id, no dangling dependency ids after
//! a delete). [`TaskStore`](super::TaskStore) wraps it with locking and
//! publication.

use tracing::debug;

use crate::errors::{Result, TasksimError};
use crate::types::{DependencySnapshot, Task};

/// Ordered by insertion; deletes remove in place.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    tasks: Vec<Task>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Append a new record. Duplicate ids and invalid records are rejected.
    pub fn insert(&mut self, task: Task) -> Result<()> {
        task.validate()?;
        if self.position(&task.id).is_some() {
            return Err(TasksimError::DuplicateTask(task.id));
        }
        debug!(task = %task.id, priority = task.priority, "task added");
        self.tasks.push(task);
        Ok(())
    }

    /// Replace the record with the same id. Returns `false` if the id is
    /// unknown (nothing changes).
    pub fn replace(&mut self, task: Task) -> bool {
        match self.position(&task.id) {
            Some(i) => {
                self.tasks[i] = task;
                true
            }
            None => false,
        }
    }

    /// Overwrite one cached dependency entry of `parent_id`.
    pub fn replace_dependency_snapshot(
        &mut self,
        parent_id: &str,
        dep_id: &str,
        snapshot: DependencySnapshot,
    ) -> bool {
        let Some(i) = self.position(parent_id) else {
            return false;
        };
        match self.tasks[i].dependencies.iter_mut().find(|d| d.id == dep_id) {
            Some(entry) => {
                *entry = snapshot;
                true
            }
            None => false,
        }
    }

    /// Refresh the cached copy of `snapshot.id` in every task that depends on
    /// it. Returns how many dependents were touched.
    pub fn propagate_dependency_snapshot(&mut self, snapshot: &DependencySnapshot) -> usize {
        let mut touched = 0;
        for task in self.tasks.iter_mut() {
            for entry in task.dependencies.iter_mut().filter(|d| d.id == snapshot.id) {
                *entry = snapshot.clone();
                touched += 1;
            }
        }
        touched
    }

    /// Remove a record and scrub its id from every dependency list.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let i = self.position(id)?;
        let removed = self.tasks.remove(i);
        for task in self.tasks.iter_mut() {
            task.dependencies.retain(|d| d.id != id);
        }
        debug!(task = %id, "task deleted and scrubbed from dependency lists");
        Some(removed)
    }
}
