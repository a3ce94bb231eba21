// src/lib.rs

pub mod alerts;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sim;
pub mod store;
pub mod types;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alerts::{AlertEvent, AlertSeverity};
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::sim::Simulation;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - alert bus / task store / engine / scheduler
/// - seeding the initial tasks
/// - alert logging
/// - Ctrl-C handling and `--once` exit
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let sim = Simulation::from_settings(&cfg.settings, args.seed);

    // Subscribe before seeding so seed-time system alerts are logged too.
    let alert_logger = spawn_alert_logger(sim.alerts().subscribe());

    sim.seed(&cfg)?;
    sim.start();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Ctrl-C received; stopping simulation");
        }
        _ = sim.wait_until_settled(), if args.once => {
            info!("simulation settled; exiting (--once)");
        }
    }

    sim.stop();
    alert_logger.abort();

    println!("{}", sim.summary());
    Ok(())
}

/// Mirror every accepted alert into the log at a matching level.
fn spawn_alert_logger(mut rx: broadcast::Receiver<AlertEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_alert(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "alert logger lagged; some alerts were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_alert(event: &AlertEvent) {
    let detail = event.detail.as_deref().unwrap_or("");
    let task = event.task_id.as_deref().unwrap_or("-");
    match event.severity {
        AlertSeverity::Success | AlertSeverity::Info => {
            info!(task, detail, "{}", event.summary)
        }
        AlertSeverity::Warn => warn!(task, detail, "{}", event.summary),
        AlertSeverity::Error => error!(task, detail, "{}", event.summary),
    }
}

/// Simple dry-run output: print settings and tasks.
fn print_dry_run(cfg: &ConfigFile) {
    let s = &cfg.settings;
    println!("tasksim dry-run");
    println!("  config.max_concurrency = {}", s.max_concurrency);
    println!("  config.max_retries = {}", s.max_retries);
    println!("  config.success_probability = {}", s.success_probability);
    println!("  config.watchdog_factor = {}", s.watchdog_factor);
    println!("  config.dedup_window = {:?}", s.dedup_window);
    println!("  config.cooldown = {:?}", s.cooldown);
    println!("  config.high_priority_threshold = {}", s.high_priority_threshold);
    if let Some(seed) = s.seed {
        println!("  config.seed = {seed}");
    }
    println!();

    println!("tasks ({}):", cfg.tasks.len());
    for task in cfg.tasks.iter() {
        println!("  - {} ({})", task.id, task.title);
        println!("      priority: {}", task.priority);
        println!("      duration: {:?}", task.duration);
        if let Some(start_in) = task.start_in {
            println!("      start_in: {start_in:?}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    debug!("dry-run complete (no simulation)");
}
