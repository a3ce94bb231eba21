// src/alerts/mod.rs

//! Operational alerts.
//!
//! - [`event`] holds the alert data model.
//! - [`dedup`] decides whether an alert repeats the previous one.
//! - [`bus`] is the publish/subscribe hub with history.

pub mod bus;
pub mod dedup;
pub mod event;

pub use bus::{AlertBus, DEFAULT_ALERT_CHANNEL_CAPACITY, DEFAULT_DEDUP_WINDOW};
pub use dedup::AlertKey;
pub use event::{Alert, AlertEvent, AlertSeverity};
