// src/config/mod.rs

//! Configuration loading and validation for tasksim.
//!
//! - `model.rs` defines the TOML-backed data model and its validated form.
//! - `loader.rs` reads a config file from disk.
//! - `validate.rs` checks durations, ids and the dependency DAG.
//! - `seed.rs` turns a validated config into initial task records.

pub mod duration;
pub mod loader;
pub mod model;
pub mod seed;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{DEFAULT_CONFIG_FILE, default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, Settings, TaskSeed, TaskSpec};
pub use seed::TaskSource;
