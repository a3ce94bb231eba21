// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::alerts::DEFAULT_DEDUP_WINDOW;
use crate::engine::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_SUCCESS_PROBABILITY,
    DEFAULT_WATCHDOG_FACTOR, EngineOptions,
};
use crate::store::{DEFAULT_COOLDOWN, DEFAULT_HIGH_PRIORITY_THRESHOLD, StoreOptions};
use crate::types::TaskId;

/// Priority given to tasks that do not set one.
pub const DEFAULT_TASK_PRIORITY: u8 = 3;

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [config]
/// max_concurrency = 3
/// success_probability = 0.7
/// cooldown = "2s"
///
/// [[task]]
/// id = "fetch"
/// duration = "800ms"
///
/// [[task]]
/// id = "build"
/// title = "Build"
/// priority = 1
/// duration = "2s"
/// after = ["fetch"]
/// ```
///
/// Not validated; convert with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Engine and alert knobs from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Seed tasks from `[[task]]`, in file order.
    #[serde(default)]
    pub task: Vec<TaskSeed>,
}

/// `[config]` section. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_success_probability")]
    pub success_probability: f64,

    /// Watchdog threshold = `watchdog_factor × duration`.
    #[serde(default = "default_watchdog_factor")]
    pub watchdog_factor: u32,

    /// Duration string, e.g. `"500ms"`.
    #[serde(default = "default_dedup_window")]
    pub dedup_window: String,

    /// Duration string, e.g. `"2s"`.
    #[serde(default = "default_cooldown")]
    pub cooldown: String,

    #[serde(default = "default_high_priority_threshold")]
    pub high_priority_threshold: usize,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_success_probability() -> f64 {
    DEFAULT_SUCCESS_PROBABILITY
}

fn default_watchdog_factor() -> u32 {
    DEFAULT_WATCHDOG_FACTOR
}

fn default_dedup_window() -> String {
    format!("{}ms", DEFAULT_DEDUP_WINDOW.as_millis())
}

fn default_cooldown() -> String {
    format!("{}ms", DEFAULT_COOLDOWN.as_millis())
}

fn default_high_priority_threshold() -> usize {
    DEFAULT_HIGH_PRIORITY_THRESHOLD
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            success_probability: default_success_probability(),
            watchdog_factor: default_watchdog_factor(),
            dedup_window: default_dedup_window(),
            cooldown: default_cooldown(),
            high_priority_threshold: default_high_priority_threshold(),
            seed: None,
        }
    }
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSeed {
    pub id: String,

    /// Display title; defaults to the id.
    #[serde(default)]
    pub title: Option<String>,

    /// 1 (highest) ..= 5 (lowest).
    #[serde(default = "default_task_priority")]
    pub priority: u8,

    /// Simulated run time, e.g. `"1500ms"`.
    pub duration: String,

    /// Delay before the task may start, relative to load time.
    #[serde(default)]
    pub start_in: Option<String>,

    /// Ids this task waits for.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_task_priority() -> u8 {
    DEFAULT_TASK_PRIORITY
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every instance has
/// parsed durations, known dependency ids and an acyclic graph.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    pub tasks: Vec<TaskSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(settings: Settings, tasks: Vec<TaskSpec>) -> Self {
        Self { settings, tasks }
    }

    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Parsed `[config]` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub success_probability: f64,
    pub watchdog_factor: u32,
    pub dedup_window: Duration,
    pub cooldown: Duration,
    pub high_priority_threshold: usize,
    pub seed: Option<u64>,
}

impl Settings {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_concurrency: self.max_concurrency,
            max_retries: self.max_retries,
            watchdog_factor: self.watchdog_factor,
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            cooldown: self.cooldown,
            high_priority_threshold: self.high_priority_threshold,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
            watchdog_factor: DEFAULT_WATCHDOG_FACTOR,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            cooldown: DEFAULT_COOLDOWN,
            high_priority_threshold: DEFAULT_HIGH_PRIORITY_THRESHOLD,
            seed: None,
        }
    }
}

/// Parsed `[[task]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: TaskId,
    pub title: String,
    pub priority: u8,
    pub duration: Duration,
    pub start_in: Option<Duration>,
    pub after: Vec<TaskId>,
}
