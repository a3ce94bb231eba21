// src/config/seed.rs

//! Initial task providers.

use std::collections::{HashMap, HashSet};

use tokio::time::Instant;

use crate::config::model::ConfigFile;
use crate::errors::{Result, TasksimError};
use crate::types::{DependencySnapshot, Task, TaskState};

/// Supplies the initial task list.
///
/// Implementations convert whatever relative or serialized time they hold
/// into absolute instants based on `now`. Dependencies must reference tasks
/// present in the same list.
pub trait TaskSource {
    fn load_tasks(&self, now: Instant) -> Result<Vec<Task>>;
}

impl TaskSource for ConfigFile {
    fn load_tasks(&self, now: Instant) -> Result<Vec<Task>> {
        let titles: HashMap<&str, &str> = self
            .tasks
            .iter()
            .map(|t| (t.id.as_str(), t.title.as_str()))
            .collect();

        self.tasks
            .iter()
            .map(|spec| {
                let mut task = Task::new(spec.id.clone(), spec.title.clone(), spec.priority, spec.duration);
                task.start_at = spec
                    .start_in
                    .map(|d| {
                        now.checked_add(d).ok_or_else(|| {
                            TasksimError::InvalidTask(format!(
                                "task '{}' start_in of {d:?} is out of range",
                                spec.id
                            ))
                        })
                    })
                    .transpose()?;
                for dep in spec.after.iter() {
                    let title = titles.get(dep.as_str()).ok_or_else(|| {
                        TasksimError::InvalidTask(format!(
                            "task '{}' depends on unknown task '{}'",
                            spec.id, dep
                        ))
                    })?;
                    task.dependencies.push(DependencySnapshot {
                        id: dep.clone(),
                        title: title.to_string(),
                        state: TaskState::Pending,
                    });
                }
                Ok(task)
            })
            .collect()
    }
}

/// A ready-made list, handed over as is.
impl TaskSource for Vec<Task> {
    fn load_tasks(&self, _now: Instant) -> Result<Vec<Task>> {
        let ids: HashSet<&str> = self.iter().map(|t| t.id.as_str()).collect();
        for task in self {
            if let Some(dep) = task.dependencies.iter().find(|d| !ids.contains(d.id.as_str())) {
                return Err(TasksimError::InvalidTask(format!(
                    "task '{}' depends on unknown task '{}'",
                    task.id, dep.id
                )));
            }
        }
        Ok(self.clone())
    }
}
