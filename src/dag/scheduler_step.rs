// src/dag/scheduler_step.rs

//! Result type for a single scheduling pass.

use tokio::time::Instant;

use crate::types::TaskId;

/// What one pass over a snapshot did.
///
/// Useful for tests that want to drive the scheduler by hand and make
/// assertions about each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerPass {
    /// Eligible tasks in the order they were considered.
    pub eligible: Vec<TaskId>,
    /// Tasks that were actually started, in dispatch order.
    pub dispatched: Vec<TaskId>,
    /// The pass stopped early because every slot was taken.
    pub capacity_exhausted: bool,
    /// Earliest future start time the pass is waiting on, if any.
    pub next_wake: Option<Instant>,
}
