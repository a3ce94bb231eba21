// src/alerts/bus.rs

//! Alert bus: broadcast stream plus append-only history.
//!
//! [`AlertBus`] wraps a [`tokio::sync::broadcast`] channel for the live feed
//! and keeps every accepted alert in a history log until it is cleared.
//!
//! Rules:
//! - `emit()` never blocks; alerts with no live subscriber still land in
//!   history.
//! - With duplicate suppression on, an alert whose key matches the last
//!   accepted alert within the dedup window is dropped entirely (no stream
//!   notification, no history entry).
//! - History and stream see accepted alerts in the same order: both are
//!   written under the same lock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::exec::Clock;

use super::dedup::{AlertKey, is_duplicate};
use super::event::{Alert, AlertEvent};

/// Two identical alerts closer than this collapse into one.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(500);

/// Ring-buffer size of the live feed.
pub const DEFAULT_ALERT_CHANNEL_CAPACITY: usize = 256;

/// Cheap to clone; all clones share one stream and one history.
#[derive(Clone, Debug)]
pub struct AlertBus {
    inner: Arc<AlertBusInner>,
}

#[derive(Debug)]
struct AlertBusInner {
    tx: broadcast::Sender<AlertEvent>,
    history: Mutex<Vec<AlertEvent>>,
    clock: Arc<dyn Clock>,
    dedup_window: Duration,
}

impl AlertBus {
    pub fn new(clock: Arc<dyn Clock>, dedup_window: Duration) -> Self {
        Self::with_capacity(clock, dedup_window, DEFAULT_ALERT_CHANNEL_CAPACITY)
    }

    /// The minimum capacity is 1 (clamped).
    pub fn with_capacity(clock: Arc<dyn Clock>, dedup_window: Duration, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(AlertBusInner {
                tx,
                history: Mutex::new(Vec::new()),
                clock,
                dedup_window,
            }),
        }
    }

    /// Stamp and publish an alert.
    ///
    /// Returns the published event, or `None` if it was suppressed as a
    /// duplicate.
    pub fn emit(&self, alert: Alert, suppress_duplicates: bool) -> Option<AlertEvent> {
        let mut history = self
            .inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let now = self.inner.clock.now();
        // Keep timestamps non-decreasing even if the clock was swapped or jittered.
        let ts = history.last().map_or(now, |last| now.max(last.ts));

        if suppress_duplicates {
            let key = AlertKey::new(alert.severity, &alert.summary, alert.detail.as_deref());
            if is_duplicate(history.last(), &key, ts, self.inner.dedup_window) {
                trace!(summary = %alert.summary, "suppressing duplicate alert");
                return None;
            }
        }

        let event = alert.stamp(ts);
        debug!(
            severity = %event.severity,
            summary = %event.summary,
            detail = ?event.detail,
            task = ?event.task_id,
            "alert emitted"
        );
        history.push(event.clone());
        // No receivers is fine; history still has it.
        let _ = self.inner.tx.send(event.clone());
        Some(event)
    }

    /// Publish with the default duplicate suppression.
    pub fn publish(&self, alert: Alert) -> Option<AlertEvent> {
        self.emit(alert, true)
    }

    /// Live feed of accepted alerts.
    ///
    /// A receiver only gets alerts emitted after it subscribed; slow receivers
    /// observe `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.inner.tx.subscribe()
    }

    /// Every accepted alert since the last clear, oldest first.
    pub fn history(&self) -> Vec<AlertEvent> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_history(&self) {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
