#![allow(dead_code)]

use std::time::Duration;

use tasksim::config::{ConfigFile, ConfigSection, RawConfigFile, TaskSeed};
use tasksim::types::{Task, TaskState};
use tokio::time::Instant;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskSeed) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.config.max_concurrency = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.config.seed = Some(seed);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `[[task]]` entry.
pub struct TaskSeedBuilder {
    seed: TaskSeed,
}

impl TaskSeedBuilder {
    pub fn new(id: &str, duration: &str) -> Self {
        Self {
            seed: TaskSeed {
                id: id.to_string(),
                title: None,
                priority: 3,
                duration: duration.to_string(),
                start_in: None,
                after: vec![],
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.seed.title = Some(title.to_string());
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.seed.priority = priority;
        self
    }

    pub fn start_in(mut self, start_in: &str) -> Self {
        self.seed.start_in = Some(start_in.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.seed.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskSeed {
        self.seed
    }
}

/// Builder for in-memory `Task` records.
///
/// Defaults: title = id uppercased, priority 3, duration 20ms, `Pending`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            task: Task::new(id, id.to_uppercase(), 3, Duration::from_millis(20)),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.task.title = title.to_string();
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.task.duration = Duration::from_millis(ms);
        self
    }

    pub fn start_at(mut self, at: Instant) -> Self {
        self.task.start_at = Some(at);
        self
    }

    pub fn after(mut self, dep: &Task) -> Self {
        self.task = self.task.depends_on(dep);
        self
    }

    pub fn state(mut self, state: TaskState) -> Self {
        self.task = self.task.with_state(state);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.task.retries = retries;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
