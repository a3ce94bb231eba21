// src/store/task_store.rs

//! The authoritative task table.
//!
//! One mutex guards the table and is the single serialization point for all
//! mutations. After a mutation commits, and while the lock is still held:
//!
//! 1. the full table is published on a `tokio::sync::watch` channel, so
//!    subscribers observe snapshots in commit order;
//! 2. the system conditions are re-evaluated and, outside their cooldown,
//!    raised on the [`AlertBus`].
//!
//! Snapshots are whole tables, never deltas. A slow subscriber may skip
//! intermediate snapshots but always sees the latest one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

use crate::alerts::AlertBus;
use crate::errors::Result;
use crate::exec::Clock;
use crate::types::{DependencySnapshot, Task};

use super::system_alerts::{self, CooldownTracker, DEFAULT_COOLDOWN, DEFAULT_HIGH_PRIORITY_THRESHOLD};
use super::table::TaskTable;

/// Full, immutable copy of the table at one point in time.
pub type TaskSnapshot = Arc<Vec<Task>>;

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Minimum spacing between two alerts for the same system condition.
    pub cooldown: Duration,
    /// Pending priority-1 count that triggers the backlog warning.
    pub high_priority_threshold: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            high_priority_threshold: DEFAULT_HIGH_PRIORITY_THRESHOLD,
        }
    }
}

/// Outcome of a [`TaskStore::transact`] closure.
#[derive(Debug)]
pub enum Commit<R> {
    /// The table changed: publish a snapshot and evaluate system alerts.
    Publish(R),
    /// Nothing changed; subscribers are not notified.
    Discard(R),
}

/// Cheap to clone; clones share the same table.
#[derive(Clone, Debug)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    state: Mutex<StoreState>,
    tx: watch::Sender<TaskSnapshot>,
    alerts: AlertBus,
    clock: Arc<dyn Clock>,
    high_priority_threshold: usize,
}

#[derive(Debug)]
struct StoreState {
    table: TaskTable,
    cooldowns: CooldownTracker,
}

impl TaskStore {
    pub fn new(alerts: AlertBus, clock: Arc<dyn Clock>, options: StoreOptions) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    table: TaskTable::new(),
                    cooldowns: CooldownTracker::new(options.cooldown),
                }),
                tx,
                alerts,
                clock,
                high_priority_threshold: options.high_priority_threshold,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The latest published table.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// Stream of full-table snapshots.
    ///
    /// The receiver starts out marked as changed, so the first `changed()`
    /// resolves immediately with the current table.
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        let mut rx = self.inner.tx.subscribe();
        rx.mark_changed();
        rx
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().table.get(id).cloned()
    }

    pub fn alerts(&self) -> &AlertBus {
        &self.inner.alerts
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Run `f` against the table under the store lock.
    ///
    /// This is the only way the table is mutated. Returning
    /// [`Commit::Publish`] publishes a snapshot and evaluates system alerts
    /// before the lock is released.
    pub fn transact<R>(&self, f: impl FnOnce(&mut TaskTable) -> Commit<R>) -> R {
        let mut state = self.lock();
        match f(&mut state.table) {
            Commit::Publish(r) => {
                self.publish_locked(&mut state);
                r
            }
            Commit::Discard(r) => r,
        }
    }

    pub fn add(&self, task: Task) -> Result<()> {
        self.transact(|table| match table.insert(task) {
            Ok(()) => Commit::Publish(Ok(())),
            Err(e) => Commit::Discard(Err(e)),
        })
    }

    /// Atomic whole-record replace. Unknown ids are silently ignored.
    pub fn replace(&self, task: Task) -> bool {
        self.transact(|table| {
            if table.replace(task) {
                Commit::Publish(true)
            } else {
                Commit::Discard(false)
            }
        })
    }

    pub fn replace_dependency_snapshot(
        &self,
        parent_id: &str,
        dep_id: &str,
        snapshot: DependencySnapshot,
    ) -> bool {
        self.transact(|table| {
            if table.replace_dependency_snapshot(parent_id, dep_id, snapshot) {
                Commit::Publish(true)
            } else {
                Commit::Discard(false)
            }
        })
    }

    /// Remove a task and every reference to it.
    pub fn delete(&self, id: &str) -> Option<Task> {
        self.transact(|table| match table.remove(id) {
            Some(task) => Commit::Publish(Some(task)),
            None => Commit::Discard(None),
        })
    }

    /// Publish the current table again even though nothing changed.
    pub fn republish(&self) {
        let mut state = self.lock();
        self.publish_locked(&mut state);
    }

    fn publish_locked(&self, state: &mut StoreState) {
        let snapshot: TaskSnapshot = Arc::new(state.table.tasks().to_vec());
        trace!(tasks = snapshot.len(), "publishing task snapshot");
        self.inner.tx.send_replace(snapshot.clone());
        self.evaluate_system_alerts(state, &snapshot);
    }

    fn evaluate_system_alerts(&self, state: &mut StoreState, snapshot: &[Task]) {
        let now = self.inner.clock.now();
        for (condition, alert) in
            system_alerts::evaluate(snapshot, now, self.inner.high_priority_threshold)
        {
            if state.cooldowns.admit(condition, now) {
                self.inner.alerts.publish(alert);
            } else {
                trace!(?condition, "system alert inside cooldown; skipped");
            }
        }
    }
}
