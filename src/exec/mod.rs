// src/exec/mod.rs

//! Simulated execution seams.
//!
//! No real workload ever runs. What a "run" does is decided by two
//! injectable pieces:
//!
//! - [`clock`] provides "now" for timestamps, start times and cooldowns.
//! - [`outcome`] decides how long a run takes and whether it succeeds.

pub mod clock;
pub mod outcome;

pub use clock::{Clock, ManualClock, TokioClock};
pub use outcome::{OutcomeSource, RandomOutcomes, RunDraw, ScriptedOutcomes};
