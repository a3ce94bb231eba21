// src/types.rs

//! Task records shared by the store, the engine and the scheduler.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{Result, TasksimError};

/// Canonical task identifier used throughout the crate.
pub type TaskId = String;

/// Highest priority (dispatched first).
pub const PRIORITY_HIGHEST: u8 = 1;
/// Lowest priority.
pub const PRIORITY_LOWEST: u8 = 5;

/// Lifecycle state of a task.
///
/// ```text
/// Pending ──► InProgress ──► Completed
///    ▲            │  ├─────► Failed   (retries exhausted)
///    └────────────┘  └─────► Blocked  (watchdog fired)
/// Pending / InProgress ───► Cancelled (external)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Blocked,
}

impl TaskState {
    /// States the scheduler will never pick up again without an external call.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled | TaskState::Blocked
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::InProgress => "in-progress",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
            TaskState::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached copy of a dependency, captured when the dependent was created.
///
/// Only used for display. Whether a dependency is satisfied is always
/// resolved by id against the live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySnapshot {
    pub id: TaskId,
    pub title: String,
    pub state: TaskState,
}

impl From<&Task> for DependencySnapshot {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            state: task.state,
        }
    }
}

/// A single unit of simulated work.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// 1 (highest) ..= 5 (lowest).
    pub priority: u8,
    /// Simulated run time; the watchdog threshold derives from it.
    pub duration: Duration,
    /// Earliest instant the task may be dispatched. `None` = immediately.
    pub start_at: Option<Instant>,
    pub dependencies: Vec<DependencySnapshot>,
    pub state: TaskState,
    /// Automatic retries already consumed.
    pub retries: u32,
    /// Mirrors `state == Completed`.
    pub completed: bool,
}

impl Task {
    /// A fresh `Pending` task with no dependencies and no start delay.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, priority: u8, duration: Duration) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority,
            duration,
            start_at: None,
            dependencies: Vec::new(),
            state: TaskState::Pending,
            retries: 0,
            completed: false,
        }
    }

    pub fn with_start_at(mut self, start_at: Instant) -> Self {
        self.start_at = Some(start_at);
        self
    }

    pub fn depends_on(mut self, dep: &Task) -> Self {
        self.dependencies.push(DependencySnapshot::from(dep));
        self
    }

    /// Replace the whole state, keeping `completed` in sync.
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self.completed = state == TaskState::Completed;
        self
    }

    pub fn depends_on_id(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d.id == id)
    }

    /// Reject records that could never be scheduled meaningfully.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(TasksimError::InvalidTask("task id must not be empty".to_string()));
        }
        if !(PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&self.priority) {
            return Err(TasksimError::InvalidTask(format!(
                "task '{}' has priority {} (expected {}..={})",
                self.id, self.priority, PRIORITY_HIGHEST, PRIORITY_LOWEST
            )));
        }
        if self.duration.is_zero() {
            return Err(TasksimError::InvalidTask(format!(
                "task '{}' must have a non-zero duration",
                self.id
            )));
        }
        if self.depends_on_id(&self.id) {
            return Err(TasksimError::InvalidTask(format!(
                "task '{}' cannot depend on itself",
                self.id
            )));
        }
        Ok(())
    }
}
