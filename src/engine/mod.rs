// src/engine/mod.rs

//! Task execution engine.
//!
//! The pure lifecycle state machine lives in [`core`]; the async shell that
//! reserves slots, runs timers and writes results back to the store is
//! implemented in [`executor`]. [`capacity`] holds the slot accounting.

use std::time::Duration;

pub mod capacity;
pub mod core;
pub mod executor;

pub use capacity::{CapacitySlots, SlotGuard};
pub use core::{Resolved, RunResolution};
pub use executor::{Dispatch, ExecutionEngine, RunHandle, SkipReason};

/// Simulated runs allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
/// Automatic retries after a failed run.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Watchdog threshold as a multiple of a task's duration.
pub const DEFAULT_WATCHDOG_FACTOR: u32 = 2;
/// Chance that a simulated run succeeds.
pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.7;

/// Engine knobs shared by every run.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub watchdog_factor: u32,
}

impl EngineOptions {
    /// Stall threshold for a task of the given duration.
    pub fn watchdog_threshold(&self, duration: Duration) -> Duration {
        duration.saturating_mul(self.watchdog_factor)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            watchdog_factor: DEFAULT_WATCHDOG_FACTOR,
        }
    }
}
