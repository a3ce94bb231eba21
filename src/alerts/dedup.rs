// src/alerts/dedup.rs

//! Duplicate detection for consecutive alerts.

use std::time::Duration;

use tokio::time::Instant;

use super::event::{AlertEvent, AlertSeverity};

/// Identity of an alert for duplicate detection. `task_id` is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    severity: AlertSeverity,
    summary: String,
    detail: Option<String>,
}

impl AlertKey {
    pub fn new(severity: AlertSeverity, summary: &str, detail: Option<&str>) -> Self {
        Self {
            severity,
            summary: summary.to_string(),
            detail: detail.map(str::to_string),
        }
    }

    pub fn of(event: &AlertEvent) -> Self {
        Self::new(event.severity, &event.summary, event.detail.as_deref())
    }
}

/// `true` when `candidate` repeats `previous` inside `window`.
///
/// A gap of exactly `window` is not a duplicate.
pub fn is_duplicate(
    previous: Option<&AlertEvent>,
    candidate_key: &AlertKey,
    candidate_ts: Instant,
    window: Duration,
) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    AlertKey::of(previous) == *candidate_key
        && candidate_ts.saturating_duration_since(previous.ts) < window
}
