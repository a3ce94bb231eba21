// src/store/system_alerts.rs

//! System-level conditions derived from the whole table.
//!
//! Evaluated after every store mutation. Each condition may fire at most
//! once per cooldown window.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::alerts::Alert;
use crate::dag::EligibilityView;
use crate::types::{PRIORITY_HIGHEST, Task, TaskState};

/// Minimum spacing between two alerts for the same condition.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

/// Pending priority-1 tasks at or above this count raise a backlog warning.
pub const DEFAULT_HIGH_PRIORITY_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCondition {
    HighPriorityBacklog,
    Idle,
}

/// Conditions that hold for this snapshot, with the alert each would raise.
pub fn evaluate(tasks: &[Task], now: Instant, high_priority_threshold: usize) -> Vec<(SystemCondition, Alert)> {
    let mut fired = Vec::new();

    let backlog = tasks
        .iter()
        .filter(|t| t.state == TaskState::Pending && t.priority == PRIORITY_HIGHEST)
        .count();
    if backlog >= high_priority_threshold {
        fired.push((
            SystemCondition::HighPriorityBacklog,
            Alert::warn("Too many high-priority tasks pending")
                .with_detail(format!("{backlog} tasks pending at priority {PRIORITY_HIGHEST}")),
        ));
    }

    let running = tasks.iter().any(|t| t.state == TaskState::InProgress);
    if !running && !EligibilityView::new(tasks).any_eligible(now) {
        fired.push((SystemCondition::Idle, Alert::info("System idle")));
    }

    fired
}

/// Remembers when each condition last fired.
#[derive(Debug)]
pub struct CooldownTracker {
    cooldown: Duration,
    last_fired: HashMap<SystemCondition, Instant>,
}

impl CooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// `true` if `condition` may fire at `now`; records the firing.
    pub fn admit(&mut self, condition: SystemCondition, now: Instant) -> bool {
        if let Some(last) = self.last_fired.get(&condition) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_fired.insert(condition, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p1(id: &str) -> Task {
        Task::new(id, id, 1, Duration::from_millis(10))
    }

    #[test]
    fn backlog_fires_at_threshold() {
        let now = Instant::now();
        let four: Vec<_> = (0..4).map(|i| p1(&format!("t{i}")).with_start_at(now + Duration::from_secs(9))).collect();
        assert!(evaluate(&four, now, 5)
            .iter()
            .all(|(c, _)| *c != SystemCondition::HighPriorityBacklog));

        let five: Vec<_> = (0..5).map(|i| p1(&format!("t{i}"))).collect();
        let fired = evaluate(&five, now, 5);
        let (_, alert) = fired
            .iter()
            .find(|(c, _)| *c == SystemCondition::HighPriorityBacklog)
            .unwrap();
        assert_eq!(alert.detail.as_deref(), Some("5 tasks pending at priority 1"));
    }

    #[test]
    fn empty_table_is_idle() {
        let fired = evaluate(&[], Instant::now(), 5);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, SystemCondition::Idle);
        assert_eq!(fired[0].1.summary, "System idle");
    }

    #[test]
    fn running_or_eligible_work_is_not_idle() {
        let now = Instant::now();
        let running = vec![p1("a").with_state(TaskState::InProgress)];
        assert!(evaluate(&running, now, 5).is_empty());
        let eligible = vec![Task::new("a", "A", 3, Duration::from_millis(1))];
        assert!(evaluate(&eligible, now, 5).is_empty());
    }

    #[test]
    fn pending_but_not_yet_startable_is_idle() {
        let now = Instant::now();
        let later = vec![Task::new("a", "A", 3, Duration::from_millis(1)).with_start_at(now + Duration::from_secs(1))];
        let fired = evaluate(&later, now, 5);
        assert!(fired.iter().any(|(c, _)| *c == SystemCondition::Idle));
    }

    #[test]
    fn cooldown_is_per_condition() {
        let t0 = Instant::now();
        let mut cd = CooldownTracker::new(DEFAULT_COOLDOWN);
        assert!(cd.admit(SystemCondition::Idle, t0));
        assert!(cd.admit(SystemCondition::HighPriorityBacklog, t0));
        assert!(!cd.admit(SystemCondition::Idle, t0 + Duration::from_millis(1999)));
        assert!(cd.admit(SystemCondition::Idle, t0 + Duration::from_millis(2000)));
    }
}
