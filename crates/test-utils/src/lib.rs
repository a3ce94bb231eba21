pub mod builders;
pub mod fake_dispatcher;

use std::sync::{Arc, Once};

use tasksim::config::Settings;
use tasksim::exec::{ScriptedOutcomes, TokioClock};
use tasksim::sim::Simulation;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=tasksim=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
///
/// Under a paused clock the timeout auto-advances, so this bounds simulated
/// time rather than wall time.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A simulation on Tokio time with default settings and scripted outcomes.
pub fn scripted_simulation(outcomes: ScriptedOutcomes) -> Simulation {
    scripted_simulation_with(&Settings::default(), outcomes)
}

pub fn scripted_simulation_with(settings: &Settings, outcomes: ScriptedOutcomes) -> Simulation {
    Simulation::new(settings, Arc::new(TokioClock), Arc::new(outcomes))
}
