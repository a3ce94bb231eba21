// src/dag/mod.rs

//! Dependency-aware scheduling.
//!
//! - [`eligibility`] is the single eligibility predicate over a snapshot.
//! - [`scheduler`] reacts to table snapshots and dispatches eligible tasks.
//! - [`scheduler_step`] defines the result of one scheduling pass.

pub mod eligibility;
pub mod scheduler;
pub mod scheduler_step;

pub use eligibility::EligibilityView;
pub use scheduler::{DispatchTarget, Scheduler};
pub use scheduler_step::SchedulerPass;
