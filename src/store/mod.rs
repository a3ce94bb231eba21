// src/store/mod.rs

//! Task table ownership.
//!
//! - [`table`] is the plain in-memory table with its invariants.
//! - [`task_store`] guards it behind one lock and publishes snapshots.
//! - [`system_alerts`] evaluates whole-table conditions after each mutation.

pub mod system_alerts;
pub mod table;
pub mod task_store;

pub use system_alerts::{
    CooldownTracker, DEFAULT_COOLDOWN, DEFAULT_HIGH_PRIORITY_THRESHOLD, SystemCondition,
};
pub use table::TaskTable;
pub use task_store::{Commit, StoreOptions, TaskSnapshot, TaskStore};
