// src/exec/outcome.rs

//! Pluggable source of simulated run outcomes.
//!
//! The engine never calls a random number generator directly; it asks an
//! [`OutcomeSource`]. Production code uses [`RandomOutcomes`] (a Bernoulli
//! draw per run); tests use [`ScriptedOutcomes`] to force a sequence of
//! results.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Task;

/// Result of one simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDraw {
    Success,
    Failure,
}

pub trait OutcomeSource: Send + Sync + Debug {
    /// How long the simulated run takes before its outcome is drawn.
    fn run_time(&self, task: &Task) -> Duration {
        task.duration
    }

    /// Decide whether this run succeeds. Called once per dispatch.
    fn draw(&self, task: &Task) -> RunDraw;
}

/// Uniform random draws with a fixed success probability.
#[derive(Debug)]
pub struct RandomOutcomes {
    rng: Mutex<StdRng>,
    success_probability: f64,
}

impl RandomOutcomes {
    pub fn new(success_probability: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), success_probability)
    }

    /// Reproducible draws for a given seed.
    pub fn seeded(success_probability: f64, seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), success_probability)
    }

    fn with_rng(rng: StdRng, success_probability: f64) -> Self {
        Self {
            rng: Mutex::new(rng),
            success_probability: success_probability.clamp(0.0, 1.0),
        }
    }
}

impl OutcomeSource for RandomOutcomes {
    fn draw(&self, _task: &Task) -> RunDraw {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        if rng.gen_bool(self.success_probability) {
            RunDraw::Success
        } else {
            RunDraw::Failure
        }
    }
}

/// Replays queued draws in order, then falls back to a default.
///
/// An optional run-time override lets tests simulate a run that overruns
/// its expected duration (to exercise the stall watchdog).
#[derive(Debug)]
pub struct ScriptedOutcomes {
    queue: Mutex<VecDeque<RunDraw>>,
    fallback: RunDraw,
    run_time: Option<Duration>,
}

impl ScriptedOutcomes {
    pub fn always(draw: RunDraw) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: draw,
            run_time: None,
        }
    }

    pub fn sequence(draws: impl IntoIterator<Item = RunDraw>, fallback: RunDraw) -> Self {
        Self {
            queue: Mutex::new(draws.into_iter().collect()),
            fallback,
            run_time: None,
        }
    }

    /// Every run takes `run_time` regardless of the task's duration.
    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = Some(run_time);
        self
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn run_time(&self, task: &Task) -> Duration {
        self.run_time.unwrap_or(task.duration)
    }

    fn draw(&self, _task: &Task) -> RunDraw {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new("t", "T", 3, Duration::from_millis(20))
    }

    #[test]
    fn probability_bounds_are_deterministic() {
        let always = RandomOutcomes::seeded(1.0, 7);
        let never = RandomOutcomes::seeded(0.0, 7);
        for _ in 0..50 {
            assert_eq!(always.draw(&task()), RunDraw::Success);
            assert_eq!(never.draw(&task()), RunDraw::Failure);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = RandomOutcomes::seeded(0.7, 42);
        let b = RandomOutcomes::seeded(0.7, 42);
        let xs: Vec<_> = (0..32).map(|_| a.draw(&task())).collect();
        let ys: Vec<_> = (0..32).map(|_| b.draw(&task())).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn scripted_replays_then_falls_back() {
        let s = ScriptedOutcomes::sequence([RunDraw::Failure, RunDraw::Failure], RunDraw::Success);
        assert_eq!(s.draw(&task()), RunDraw::Failure);
        assert_eq!(s.draw(&task()), RunDraw::Failure);
        assert_eq!(s.draw(&task()), RunDraw::Success);
        assert_eq!(s.run_time(&task()), Duration::from_millis(20));
    }
}
