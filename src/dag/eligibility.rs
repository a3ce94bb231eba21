// src/dag/eligibility.rs

//! Canonical dependency-satisfaction and eligibility checks.
//!
//! Both the scheduler (what to dispatch) and the task store (is the system
//! idle?) must agree on what "eligible" means, so the predicate lives here
//! and nowhere else.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::types::{Task, TaskState};

/// Read-only index over one table snapshot.
pub struct EligibilityView<'a> {
    tasks: &'a [Task],
    by_id: HashMap<&'a str, &'a Task>,
}

impl<'a> EligibilityView<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let by_id = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        Self { tasks, by_id }
    }

    /// Every dependency still present in the snapshot is `Completed`.
    ///
    /// A dependency id that is no longer in the snapshot (deleted) counts as
    /// satisfied. The cached state inside `task.dependencies` is never
    /// consulted.
    pub fn deps_satisfied(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep| {
            self.by_id
                .get(dep.id.as_str())
                .is_none_or(|live| live.state == TaskState::Completed)
        })
    }

    /// `Pending`, dependencies satisfied, and start time reached.
    pub fn is_eligible(&self, task: &Task, now: Instant) -> bool {
        task.state == TaskState::Pending
            && self.deps_satisfied(task)
            && task.start_at.is_none_or(|at| at <= now)
    }

    /// Eligible tasks, highest priority first; equal priorities keep
    /// snapshot order.
    pub fn eligible_in_priority_order(&self, now: Instant) -> Vec<&'a Task> {
        let mut eligible: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| self.is_eligible(t, now))
            .collect();
        // sort_by_key is stable.
        eligible.sort_by_key(|t| t.priority);
        eligible
    }

    pub fn any_eligible(&self, now: Instant) -> bool {
        self.tasks.iter().any(|t| self.is_eligible(t, now))
    }

    /// Earliest future `start_at` among pending tasks that are only waiting
    /// on the clock.
    ///
    /// Nothing in the table changes when a start time passes, so the
    /// scheduler uses this to wake itself up.
    pub fn next_start_at(&self, now: Instant) -> Option<Instant> {
        self.tasks
            .iter()
            .filter(|t| t.state == TaskState::Pending && self.deps_satisfied(t))
            .filter_map(|t| t.start_at)
            .filter(|at| *at > now)
            .min()
    }

    /// Nothing is running and nothing can become runnable on its own.
    ///
    /// Pending tasks stuck behind a failed, cancelled or blocked dependency
    /// do not keep the system busy.
    pub fn is_settled(&self, now: Instant) -> bool {
        !self
            .tasks
            .iter()
            .any(|t| t.state == TaskState::InProgress)
            && !self.any_eligible(now)
            && self.next_start_at(now).is_none()
            && !self.any_waiting_on_live_dependency()
    }

    fn any_waiting_on_live_dependency(&self) -> bool {
        self.tasks.iter().any(|t| {
            t.state == TaskState::Pending
                && t.dependencies.iter().any(|dep| {
                    self.by_id.get(dep.id.as_str()).is_some_and(|live| {
                        matches!(live.state, TaskState::Pending | TaskState::InProgress)
                    })
                })
        })
    }
}
