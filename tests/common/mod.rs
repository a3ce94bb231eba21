#![allow(dead_code)]

pub use tasksim_test_utils::builders;
pub use tasksim_test_utils::{init_tracing, scripted_simulation, scripted_simulation_with, with_timeout};

use tasksim::alerts::{AlertEvent, AlertSeverity};

/// Alerts in `history` with the given severity, oldest first.
pub fn alerts_of(history: &[AlertEvent], severity: AlertSeverity) -> Vec<AlertEvent> {
    history
        .iter()
        .filter(|e| e.severity == severity)
        .cloned()
        .collect()
}

/// Summaries of every alert in `history`, oldest first.
pub fn summaries(history: &[AlertEvent]) -> Vec<String> {
    history.iter().map(|e| e.summary.clone()).collect()
}
