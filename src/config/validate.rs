// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, Settings, TaskSeed, TaskSpec};
use crate::errors::{Result, TasksimError};
use crate::types::{PRIORITY_HIGHEST, PRIORITY_LOWEST};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TasksimError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        let settings = validate_settings(&raw.config)?;
        let tasks = raw
            .task
            .iter()
            .map(validate_task)
            .collect::<Result<Vec<_>>>()?;
        validate_unique_ids(&tasks)?;
        validate_task_dependencies(&tasks)?;
        validate_dag(&tasks)?;
        Ok(ConfigFile::new_unchecked(settings, tasks))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TasksimError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| TasksimError::ConfigError(format!("{field}: {e}")))
}

fn validate_settings(cfg: &ConfigSection) -> Result<Settings> {
    if cfg.max_concurrency == 0 {
        return Err(TasksimError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&cfg.success_probability) {
        return Err(TasksimError::ConfigError(format!(
            "[config].success_probability must be within 0..=1 (got {})",
            cfg.success_probability
        )));
    }
    if cfg.watchdog_factor == 0 {
        return Err(TasksimError::ConfigError(
            "[config].watchdog_factor must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(Settings {
        max_concurrency: cfg.max_concurrency,
        max_retries: cfg.max_retries,
        success_probability: cfg.success_probability,
        watchdog_factor: cfg.watchdog_factor,
        dedup_window: duration_field("[config].dedup_window", &cfg.dedup_window)?,
        cooldown: duration_field("[config].cooldown", &cfg.cooldown)?,
        high_priority_threshold: cfg.high_priority_threshold,
        seed: cfg.seed,
    })
}

fn validate_task(seed: &TaskSeed) -> Result<TaskSpec> {
    let id = seed.id.trim();
    if id.is_empty() {
        return Err(TasksimError::ConfigError(
            "every [[task]] needs a non-empty `id`".to_string(),
        ));
    }
    if !(PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&seed.priority) {
        return Err(TasksimError::ConfigError(format!(
            "task '{id}' has priority {} (expected {PRIORITY_HIGHEST}..={PRIORITY_LOWEST})",
            seed.priority
        )));
    }

    let duration = duration_field(&format!("task '{id}' duration"), &seed.duration)?;
    if duration.is_zero() {
        return Err(TasksimError::ConfigError(format!(
            "task '{id}' must have a non-zero duration"
        )));
    }
    let start_in = seed
        .start_in
        .as_deref()
        .map(|s| duration_field(&format!("task '{id}' start_in"), s))
        .transpose()?;

    Ok(TaskSpec {
        id: id.to_string(),
        title: seed.title.clone().unwrap_or_else(|| id.to_string()),
        priority: seed.priority,
        duration,
        start_in,
        after: seed.after.iter().map(|d| d.trim().to_string()).collect(),
    })
}

fn validate_unique_ids(tasks: &[TaskSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(TasksimError::ConfigError(format!(
                "task id '{}' is defined more than once",
                task.id
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(tasks: &[TaskSpec]) -> Result<()> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for task in tasks {
        for dep in task.after.iter() {
            if dep == &task.id {
                return Err(TasksimError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    task.id
                )));
            }
            if !known.contains(dep.as_str()) {
                return Err(TasksimError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    task.id, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(tasks: &[TaskSpec]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in tasks {
        graph.add_node(task.id.as_str());
    }
    for task in tasks {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), task.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TasksimError::DagCycle(format!(
            "cycle detected in task dependencies involving task '{}'",
            cycle.node_id()
        ))),
    }
}
