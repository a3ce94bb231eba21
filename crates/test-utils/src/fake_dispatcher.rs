use std::sync::{Arc, Mutex};

use tasksim::dag::DispatchTarget;
use tasksim::store::TaskSnapshot;
use tasksim::types::{Task, TaskId};
use tokio::sync::watch;
use tokio::time::Instant;

/// A fake dispatch target that:
/// - serves snapshots pushed with [`publish`](Self::publish)
/// - records every dispatch and holds one slot per dispatched task until
///   [`finish`](Self::finish) is called.
///
/// It never changes task states, so a task stays eligible after dispatch;
/// tests that care use the recorded order only.
#[derive(Clone, Debug)]
pub struct RecordingDispatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    slots: usize,
    tx: watch::Sender<TaskSnapshot>,
    dispatched: Mutex<Vec<TaskId>>,
    active: Mutex<Vec<TaskId>>,
}

impl RecordingDispatcher {
    pub fn new(slots: usize) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(Inner {
                slots,
                tx,
                dispatched: Mutex::new(Vec::new()),
                active: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Publish a new snapshot to the scheduler.
    pub fn publish(&self, tasks: Vec<Task>) {
        self.inner.tx.send_replace(Arc::new(tasks));
    }

    /// Every dispatch so far, in order.
    pub fn dispatched(&self) -> Vec<TaskId> {
        self.inner.dispatched.lock().unwrap().clone()
    }

    /// Free the slot held by `id`.
    pub fn finish(&self, id: &str) {
        self.inner.active.lock().unwrap().retain(|a| a != id);
    }

    /// Number of live snapshot subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl DispatchTarget for RecordingDispatcher {
    fn tasks_stream(&self) -> watch::Receiver<TaskSnapshot> {
        let mut rx = self.inner.tx.subscribe();
        rx.mark_changed();
        rx
    }

    fn has_capacity(&self) -> bool {
        self.inner.active.lock().unwrap().len() < self.inner.slots
    }

    fn try_dispatch(&self, id: &str) -> bool {
        let mut active = self.inner.active.lock().unwrap();
        if active.len() >= self.inner.slots || active.iter().any(|a| a == id) {
            return false;
        }
        active.push(id.to_string());
        self.inner.dispatched.lock().unwrap().push(id.to_string());
        true
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
