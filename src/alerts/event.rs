// src/alerts/event.rs

use std::fmt;

use tokio::time::Instant;

use crate::types::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    Success,
    Info,
    Warn,
    Error,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Success => "success",
            AlertSeverity::Info => "info",
            AlertSeverity::Warn => "warn",
            AlertSeverity::Error => "error",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert before it is stamped and published.
///
/// ```
/// use tasksim::alerts::{Alert, AlertSeverity};
///
/// let alert = Alert::info("Retrying Build").with_detail("Attempt 1/3").for_task("build");
/// assert_eq!(alert.severity, AlertSeverity::Info);
/// assert_eq!(alert.task_id.as_deref(), Some("build"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub summary: String,
    pub detail: Option<String>,
    pub task_id: Option<TaskId>,
}

impl Alert {
    pub fn new(severity: AlertSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            task_id: None,
        }
    }

    pub fn success(summary: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Success, summary)
    }

    pub fn info(summary: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Info, summary)
    }

    pub fn warn(summary: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Warn, summary)
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(AlertSeverity::Error, summary)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn for_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub(crate) fn stamp(self, ts: Instant) -> AlertEvent {
        AlertEvent {
            severity: self.severity,
            summary: self.summary,
            detail: self.detail,
            task_id: self.task_id,
            ts,
        }
    }
}

/// A published alert. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub severity: AlertSeverity,
    pub summary: String,
    pub detail: Option<String>,
    pub task_id: Option<TaskId>,
    /// Emission time; non-decreasing in emission order.
    pub ts: Instant,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
