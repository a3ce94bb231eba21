// src/engine/core.rs

//! Pure lifecycle transitions.
//!
//! Every function here takes the current record and returns the record that
//! should replace it, plus the alert the transition raises. Nothing touches
//! the store, the clock or a timer, so the state machine can be unit tested
//! without Tokio.
//!
//! `None` means "not valid from this state": callers treat that as a silent
//! no-op.

use std::time::Duration;

use tokio::time::Instant;

use crate::alerts::Alert;
use crate::exec::RunDraw;
use crate::types::{Task, TaskState};

/// How a finished run was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResolution {
    Completed,
    /// Failed, went back to `Pending`. `attempt` is the new retry count.
    Retrying { attempt: u32 },
    /// Failed with no retries left.
    Failed,
    /// Cancelled while the run was in flight.
    Cancelled,
    /// The task was deleted, blocked or rescheduled while the run was in
    /// flight; the run left no trace.
    Abandoned,
}

/// Result of resolving a run against the live record.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub resolution: RunResolution,
    /// Replacement record, if the table must change.
    pub update: Option<Task>,
    pub alert: Option<Alert>,
}

impl Resolved {
    fn abandoned() -> Self {
        Self {
            resolution: RunResolution::Abandoned,
            update: None,
            alert: None,
        }
    }
}

/// `Pending` → `InProgress`.
pub fn begin_run(task: &Task) -> Option<Task> {
    (task.state == TaskState::Pending).then(|| task.clone().with_state(TaskState::InProgress))
}

/// Resolve a run that just finished its simulated run time.
///
/// `live` is the record as it is now, or `None` if it was deleted. `draw` is
/// only consulted when the task is still `InProgress`.
pub fn resolve_run(
    live: Option<&Task>,
    draw: impl FnOnce(&Task) -> RunDraw,
    max_retries: u32,
) -> Resolved {
    let Some(task) = live else {
        return Resolved::abandoned();
    };

    match task.state {
        TaskState::InProgress => {}
        TaskState::Cancelled => {
            return Resolved {
                resolution: RunResolution::Cancelled,
                update: None,
                alert: Some(Alert::info(format!("Task {} cancelled", task.title)).for_task(&task.id)),
            };
        }
        _ => return Resolved::abandoned(),
    }

    match draw(task) {
        RunDraw::Success => Resolved {
            resolution: RunResolution::Completed,
            update: Some(task.clone().with_state(TaskState::Completed)),
            alert: Some(Alert::success(format!("Completed {}", task.title)).for_task(&task.id)),
        },
        RunDraw::Failure if task.retries < max_retries => {
            let mut next = task.clone().with_state(TaskState::Pending);
            next.retries += 1;
            let attempt = next.retries;
            Resolved {
                resolution: RunResolution::Retrying { attempt },
                alert: Some(retry_alert(&next, max_retries)),
                update: Some(next),
            }
        }
        RunDraw::Failure => Resolved {
            resolution: RunResolution::Failed,
            update: Some(task.clone().with_state(TaskState::Failed)),
            alert: Some(failure_alert(task)),
        },
    }
}

/// `Pending` / `InProgress` → `Cancelled`.
///
/// Raises the same alert as an exhausted retry budget.
pub fn cancel(task: &Task) -> Option<(Task, Alert)> {
    matches!(task.state, TaskState::Pending | TaskState::InProgress)
        .then(|| (task.clone().with_state(TaskState::Cancelled), failure_alert(task)))
}

/// `Failed` → `Pending` with the retry count reset to 1.
pub fn retry(task: &Task, max_retries: u32) -> Option<(Task, Alert)> {
    if task.state != TaskState::Failed {
        return None;
    }
    let mut next = task.clone().with_state(TaskState::Pending);
    next.retries = 1;
    let alert = retry_alert(&next, max_retries);
    Some((next, alert))
}

/// New start time, back to `Pending`.
///
/// Completed and cancelled tasks stay where they are.
pub fn reschedule(task: &Task, start_at: Option<Instant>) -> Option<Task> {
    if matches!(task.state, TaskState::Completed | TaskState::Cancelled) {
        return None;
    }
    let mut next = task.clone().with_state(TaskState::Pending);
    next.start_at = start_at;
    Some(next)
}

/// Watchdog fired: `InProgress` → `Blocked`.
pub fn block(task: &Task, threshold: Duration) -> Option<(Task, Alert)> {
    (task.state == TaskState::InProgress).then(|| {
        let alert = Alert::warn(format!("Task {} blocked", task.title))
            .with_detail(format!("Exceeded {}ms", threshold.as_millis()))
            .for_task(&task.id);
        (task.clone().with_state(TaskState::Blocked), alert)
    })
}

fn retry_alert(task: &Task, max_retries: u32) -> Alert {
    Alert::info(format!("Retrying {}", task.title))
        .with_detail(format!("Attempt {}/{}", task.retries, max_retries + 1))
        .for_task(&task.id)
}

fn failure_alert(task: &Task) -> Alert {
    Alert::error(format!("Failed {}", task.title))
        .with_detail("No more retries")
        .for_task(&task.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertSeverity;

    fn t(state: TaskState) -> Task {
        Task::new("a", "Alpha", 2, Duration::from_millis(20)).with_state(state)
    }

    #[test]
    fn begin_run_only_from_pending() {
        assert_eq!(begin_run(&t(TaskState::Pending)).unwrap().state, TaskState::InProgress);
        assert!(begin_run(&t(TaskState::InProgress)).is_none());
        assert!(begin_run(&t(TaskState::Failed)).is_none());
    }

    #[test]
    fn success_completes_and_sets_flag() {
        let task = t(TaskState::InProgress);
        let r = resolve_run(Some(&task), |_| RunDraw::Success, 2);
        assert_eq!(r.resolution, RunResolution::Completed);
        let update = r.update.unwrap();
        assert_eq!(update.state, TaskState::Completed);
        assert!(update.completed);
        let alert = r.alert.unwrap();
        assert_eq!(alert.severity, AlertSeverity::Success);
        assert_eq!(alert.summary, "Completed Alpha");
    }

    #[test]
    fn failure_retries_until_budget_is_spent() {
        let mut task = t(TaskState::InProgress);
        for attempt in 1..=2 {
            let r = resolve_run(Some(&task), |_| RunDraw::Failure, 2);
            assert_eq!(r.resolution, RunResolution::Retrying { attempt });
            assert_eq!(
                r.alert.unwrap().detail.as_deref(),
                Some(format!("Attempt {attempt}/3").as_str())
            );
            task = r.update.unwrap().with_state(TaskState::InProgress);
        }

        let r = resolve_run(Some(&task), |_| RunDraw::Failure, 2);
        assert_eq!(r.resolution, RunResolution::Failed);
        let update = r.update.unwrap();
        assert_eq!(update.state, TaskState::Failed);
        assert_eq!(update.retries, 2);
        assert_eq!(r.alert.unwrap().detail.as_deref(), Some("No more retries"));
    }

    #[test]
    fn cancelled_run_keeps_state_and_reports() {
        let task = t(TaskState::Cancelled);
        let r = resolve_run(Some(&task), |_| panic!("must not draw"), 2);
        assert_eq!(r.resolution, RunResolution::Cancelled);
        assert!(r.update.is_none());
        assert_eq!(r.alert.unwrap().summary, "Task Alpha cancelled");
    }

    #[test]
    fn deleted_blocked_or_rescheduled_runs_are_abandoned() {
        assert_eq!(resolve_run(None, |_| RunDraw::Success, 2).resolution, RunResolution::Abandoned);
        for state in [TaskState::Blocked, TaskState::Pending] {
            let r = resolve_run(Some(&t(state)), |_| panic!("must not draw"), 2);
            assert_eq!(r.resolution, RunResolution::Abandoned);
            assert!(r.alert.is_none());
        }
    }

    #[test]
    fn cancel_reuses_failure_wording() {
        let (next, alert) = cancel(&t(TaskState::InProgress)).unwrap();
        assert_eq!(next.state, TaskState::Cancelled);
        assert_eq!(alert.severity, AlertSeverity::Error);
        assert_eq!(alert.summary, "Failed Alpha");
        assert_eq!(alert.detail.as_deref(), Some("No more retries"));
        assert!(cancel(&t(TaskState::Completed)).is_none());
        assert!(cancel(&t(TaskState::Blocked)).is_none());
    }

    #[test]
    fn retry_resets_count_to_one() {
        let mut failed = t(TaskState::Failed);
        failed.retries = 2;
        let (next, alert) = retry(&failed, 2).unwrap();
        assert_eq!(next.state, TaskState::Pending);
        assert_eq!(next.retries, 1);
        assert_eq!(alert.detail.as_deref(), Some("Attempt 1/3"));
        assert!(retry(&t(TaskState::Blocked), 2).is_none());
    }

    #[test]
    fn reschedule_recovers_blocked_but_not_finished() {
        let at = Instant::now() + Duration::from_secs(1);
        let next = reschedule(&t(TaskState::Blocked), Some(at)).unwrap();
        assert_eq!(next.state, TaskState::Pending);
        assert_eq!(next.start_at, Some(at));
        assert!(reschedule(&t(TaskState::Completed), Some(at)).is_none());
        assert!(reschedule(&t(TaskState::Cancelled), None).is_none());
    }

    #[test]
    fn block_names_threshold() {
        let (next, alert) = block(&t(TaskState::InProgress), Duration::from_millis(40)).unwrap();
        assert_eq!(next.state, TaskState::Blocked);
        assert_eq!(alert.summary, "Task Alpha blocked");
        assert_eq!(alert.detail.as_deref(), Some("Exceeded 40ms"));
        assert!(block(&t(TaskState::Completed), Duration::from_millis(40)).is_none());
    }
}
