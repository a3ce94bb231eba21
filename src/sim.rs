// src/sim.rs

//! Component wiring.
//!
//! [`Simulation`] builds AlertBus → TaskStore → ExecutionEngine → Scheduler
//! and owns them for the lifetime of one simulation. Nothing is a global;
//! tests build their own instance with a scripted outcome source.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::info;

use crate::alerts::AlertBus;
use crate::config::{Settings, TaskSource};
use crate::dag::{EligibilityView, Scheduler};
use crate::engine::ExecutionEngine;
use crate::errors::Result;
use crate::exec::{Clock, OutcomeSource, RandomOutcomes, TokioClock};
use crate::store::{TaskSnapshot, TaskStore};
use crate::types::{Task, TaskState};

pub struct Simulation {
    engine: ExecutionEngine,
    scheduler: Scheduler<ExecutionEngine>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("engine", &self.engine)
            .field("scheduler_running", &self.scheduler.is_running())
            .finish()
    }
}

impl Simulation {
    pub fn new(settings: &Settings, clock: Arc<dyn Clock>, outcomes: Arc<dyn OutcomeSource>) -> Self {
        let alerts = AlertBus::new(clock.clone(), settings.dedup_window);
        let store = TaskStore::new(alerts, clock, settings.store_options());
        let engine = ExecutionEngine::new(store, outcomes, settings.engine_options());
        let scheduler = Scheduler::new(engine.clone());
        Self { engine, scheduler }
    }

    /// Real time and random outcomes. `seed` overrides `settings.seed`.
    pub fn from_settings(settings: &Settings, seed: Option<u64>) -> Self {
        let outcomes = match seed.or(settings.seed) {
            Some(seed) => RandomOutcomes::seeded(settings.success_probability, seed),
            None => RandomOutcomes::new(settings.success_probability),
        };
        Self::new(settings, Arc::new(TokioClock), Arc::new(outcomes))
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &Scheduler<ExecutionEngine> {
        &self.scheduler
    }

    pub fn store(&self) -> &TaskStore {
        self.engine.store()
    }

    pub fn alerts(&self) -> &AlertBus {
        self.engine.alerts()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.engine.snapshot()
    }

    /// Add every task from `source`, in order. Stops at the first rejected
    /// task.
    pub fn seed(&self, source: &impl TaskSource) -> Result<usize> {
        let tasks = source.load_tasks(self.engine.now())?;
        let count = tasks.len();
        for task in tasks {
            self.engine.add_task(task)?;
        }
        info!(tasks = count, "seeded initial tasks");
        Ok(count)
    }

    pub fn start(&self) -> bool {
        self.scheduler.start()
    }

    pub fn stop(&self) -> bool {
        self.scheduler.stop()
    }

    /// Nothing is running and nothing can start without an external call.
    pub fn is_settled(&self) -> bool {
        self.engine.active_count() == 0 && is_settled(&self.snapshot(), self.engine.now())
    }

    /// Resolve once [`is_settled`](Self::is_settled) holds.
    pub async fn wait_until_settled(&self) {
        let mut rx = self.engine.tasks_stream();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if self.engine.active_count() == 0 && is_settled(&snapshot, self.engine.now()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.snapshot())
    }
}

fn is_settled(tasks: &[Task], now: Instant) -> bool {
    EligibilityView::new(tasks).is_settled(now)
}

/// Task counts per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub blocked: usize,
}

impl Summary {
    pub fn of(tasks: &[Task]) -> Self {
        let mut s = Summary {
            total: tasks.len(),
            ..Summary::default()
        };
        for task in tasks {
            match task.state {
                TaskState::Pending => s.pending += 1,
                TaskState::InProgress => s.in_progress += 1,
                TaskState::Completed => s.completed += 1,
                TaskState::Failed => s.failed += 1,
                TaskState::Cancelled => s.cancelled += 1,
                TaskState::Blocked => s.blocked += 1,
            }
        }
        s
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks: {} completed, {} failed, {} blocked, {} cancelled, {} pending, {} in progress",
            self.total,
            self.completed,
            self.failed,
            self.blocked,
            self.cancelled,
            self.pending,
            self.in_progress
        )
    }
}
