// src/engine/executor.rs

//! Async execution shell around the pure lifecycle in [`super::core`].
//!
//! All table reads and writes go through [`TaskStore::transact`], so every
//! decision is taken against the live record, never a captured snapshot.
//! Transition alerts are published inside the same transaction, which keeps
//! them ordered before any system alert the mutation triggers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::alerts::{Alert, AlertBus};
use crate::errors::Result;
use crate::exec::OutcomeSource;
use crate::store::{Commit, TaskSnapshot, TaskStore};
use crate::types::{DependencySnapshot, Task, TaskId, TaskState};

use super::EngineOptions;
use super::capacity::{CapacitySlots, SlotGuard};
use super::core::{self, RunResolution};

/// Why a dispatch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownTask,
    NotPending(TaskState),
    NoCapacity,
}

/// Result of [`ExecutionEngine::dispatch`].
#[derive(Debug)]
pub enum Dispatch {
    /// The task is now `InProgress`; the handle resolves when the run ends.
    Started(RunHandle),
    /// Nothing changed.
    Skipped(SkipReason),
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Dispatch::Started(_))
    }

    pub fn into_handle(self) -> Option<RunHandle> {
        match self {
            Dispatch::Started(handle) => Some(handle),
            Dispatch::Skipped(_) => None,
        }
    }
}

/// Completion signal for one in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    task_id: TaskId,
    join: JoinHandle<RunResolution>,
}

impl RunHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the run to resolve.
    ///
    /// A run torn down with its runtime counts as abandoned.
    pub async fn finished(self) -> RunResolution {
        self.join.await.unwrap_or(RunResolution::Abandoned)
    }
}

/// Owns the lifecycle of every task in the store.
///
/// Cheap to clone; clones share the store, the slots and the outcome source.
#[derive(Clone, Debug)]
pub struct ExecutionEngine {
    store: TaskStore,
    slots: CapacitySlots,
    outcomes: Arc<dyn OutcomeSource>,
    options: EngineOptions,
}

impl ExecutionEngine {
    pub fn new(store: TaskStore, outcomes: Arc<dyn OutcomeSource>, options: EngineOptions) -> Self {
        Self {
            slots: CapacitySlots::new(options.max_concurrency),
            store,
            outcomes,
            options,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn alerts(&self) -> &AlertBus {
        self.store.alerts()
    }

    pub fn now(&self) -> Instant {
        self.store.clock().now()
    }

    pub fn has_capacity(&self) -> bool {
        self.slots.has_capacity()
    }

    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.store.snapshot()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.store.get(id)
    }

    /// Full-table snapshots, starting with the current one.
    pub fn tasks_stream(&self) -> watch::Receiver<TaskSnapshot> {
        self.store.subscribe()
    }

    pub fn add_task(&self, task: Task) -> Result<()> {
        let id = task.id.clone();
        self.store.add(task)?;
        debug!(task = %id, "task added");
        Ok(())
    }

    /// Start a simulated run for `id`.
    ///
    /// A silent no-op unless the task exists, is `Pending` and a slot is
    /// free. On success the slot is reserved and the task is `InProgress`
    /// before this returns. Must be called from within a Tokio runtime.
    pub fn dispatch(&self, id: &str) -> Dispatch {
        let started = self.store.transact(|table| {
            let Some(task) = table.get(id) else {
                return Commit::Discard(Err(SkipReason::UnknownTask));
            };
            let Some(running) = core::begin_run(task) else {
                return Commit::Discard(Err(SkipReason::NotPending(task.state)));
            };
            let Some(slot) = self.slots.try_reserve(id) else {
                return Commit::Discard(Err(SkipReason::NoCapacity));
            };
            table.replace(running.clone());
            Commit::Publish(Ok((running, slot)))
        });

        match started {
            Ok((task, slot)) => {
                info!(
                    task = %task.id,
                    priority = task.priority,
                    duration_ms = task.duration.as_millis() as u64,
                    retries = task.retries,
                    "dispatching task"
                );
                let task_id = task.id.clone();
                let engine = self.clone();
                let join = tokio::spawn(async move { engine.drive_run(task, slot).await });
                Dispatch::Started(RunHandle { task_id, join })
            }
            Err(reason) => {
                debug!(task = %id, ?reason, "dispatch skipped");
                Dispatch::Skipped(reason)
            }
        }
    }

    /// The life of one run: wait out the simulated run time while a
    /// watchdog watches for an overrun, then resolve against the live record.
    async fn drive_run(self, task: Task, slot: SlotGuard) -> RunResolution {
        let run_time = self.outcomes.run_time(&task);
        let threshold = self.options.watchdog_threshold(task.duration);

        let run = tokio::time::sleep(run_time);
        tokio::pin!(run);

        tokio::select! {
            biased;
            _ = &mut run => {}
            _ = tokio::time::sleep(threshold) => {
                self.fire_watchdog(&task.id, threshold);
                run.await;
            }
        }

        let resolution = self.resolve(&task.id);
        drop(slot);
        self.store.republish();
        resolution
    }

    fn fire_watchdog(&self, id: &str, threshold: Duration) {
        self.store.transact(|table| {
            match table.get(id).and_then(|t| core::block(t, threshold)) {
                Some((blocked, alert)) => {
                    warn!(
                        task = %id,
                        threshold_ms = threshold.as_millis() as u64,
                        "task exceeded watchdog threshold; marking blocked"
                    );
                    table.replace(blocked);
                    self.store.alerts().publish(alert);
                    Commit::Publish(())
                }
                None => Commit::Discard(()),
            }
        });
    }

    fn resolve(&self, id: &str) -> RunResolution {
        let max_retries = self.options.max_retries;
        self.store.transact(|table| {
            let resolved = core::resolve_run(table.get(id), |t| self.outcomes.draw(t), max_retries);

            match resolved.resolution {
                RunResolution::Completed => info!(task = %id, "task completed"),
                RunResolution::Retrying { attempt } => {
                    info!(task = %id, attempt, "task failed; retrying")
                }
                RunResolution::Failed => info!(task = %id, "task failed; no retries left"),
                RunResolution::Cancelled => debug!(task = %id, "run finished after cancellation"),
                RunResolution::Abandoned => debug!(task = %id, "run abandoned"),
            }

            let changed = match resolved.update {
                Some(update) => {
                    if update.state == TaskState::Completed {
                        let stamped = table.propagate_dependency_snapshot(&DependencySnapshot::from(&update));
                        debug!(task = %id, dependents = stamped, "propagated completion");
                    }
                    table.replace(update)
                }
                None => false,
            };
            if let Some(alert) = resolved.alert {
                self.store.alerts().publish(alert);
            }

            if changed {
                Commit::Publish(resolved.resolution)
            } else {
                Commit::Discard(resolved.resolution)
            }
        })
    }

    /// Apply a pure transition to one record and publish its alert.
    fn apply(
        &self,
        id: &str,
        op: &'static str,
        f: impl FnOnce(&Task) -> Option<(Task, Option<Alert>)>,
    ) -> bool {
        let applied = self.store.transact(|table| {
            let Some(current) = table.get(id) else {
                return Commit::Discard(None);
            };
            let from = current.state;
            match f(current) {
                Some((next, alert)) => {
                    let to = next.state;
                    table.replace(next);
                    if let Some(alert) = alert {
                        self.store.alerts().publish(alert);
                    }
                    Commit::Publish(Some(Ok((from, to))))
                }
                None => Commit::Discard(Some(Err(from))),
            }
        });

        match applied {
            None => {
                warn!(task = %id, op, "unknown task id; ignoring");
                false
            }
            Some(Err(state)) => {
                debug!(task = %id, op, ?state, "transition not valid from this state");
                false
            }
            Some(Ok((from, to))) => {
                debug!(task = %id, op, ?from, ?to, "task transitioned");
                true
            }
        }
    }

    /// `Pending` / `InProgress` → `Cancelled`. An in-flight run is not
    /// aborted; it notices the cancellation when it resolves.
    pub fn cancel_task(&self, id: &str) -> bool {
        self.apply(id, "cancel", |t| core::cancel(t).map(|(next, alert)| (next, Some(alert))))
    }

    /// `Failed` → `Pending`.
    pub fn retry_task(&self, id: &str) -> bool {
        let max_retries = self.options.max_retries;
        self.apply(id, "retry", |t| {
            core::retry(t, max_retries).map(|(next, alert)| (next, Some(alert)))
        })
    }

    /// Remove a task in any state. An in-flight run is abandoned when it
    /// resolves.
    pub fn delete_task(&self, id: &str) -> Option<Task> {
        let removed = self.store.delete(id);
        match &removed {
            Some(task) => debug!(task = %id, state = ?task.state, "task deleted"),
            None => warn!(task = %id, "delete of unknown task id; ignoring"),
        }
        removed
    }

    /// Set a new start time and force the task back to `Pending`.
    pub fn update_start_time(&self, id: &str, start_at: Option<Instant>) -> bool {
        self.apply(id, "update_start_time", |t| core::reschedule(t, start_at).map(|next| (next, None)))
    }
}
