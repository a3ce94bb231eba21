// src/dag/scheduler.rs

use std::future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::dag::eligibility::EligibilityView;
use crate::dag::scheduler_step::SchedulerPass;
use crate::engine::ExecutionEngine;
use crate::store::TaskSnapshot;
use crate::types::Task;

/// What the scheduler drives.
///
/// The scheduler only reads snapshots and asks for dispatches; it never
/// mutates the table itself.
pub trait DispatchTarget: Clone + Send + Sync + 'static {
    /// Full-table snapshots; the first `changed()` must resolve immediately.
    fn tasks_stream(&self) -> watch::Receiver<TaskSnapshot>;

    fn has_capacity(&self) -> bool;

    /// Try to start `id`. `false` means nothing happened.
    fn try_dispatch(&self, id: &str) -> bool;

    fn now(&self) -> Instant;
}

impl DispatchTarget for ExecutionEngine {
    fn tasks_stream(&self) -> watch::Receiver<TaskSnapshot> {
        ExecutionEngine::tasks_stream(self)
    }

    fn has_capacity(&self) -> bool {
        ExecutionEngine::has_capacity(self)
    }

    fn try_dispatch(&self, id: &str) -> bool {
        self.dispatch(id).is_started()
    }

    fn now(&self) -> Instant {
        ExecutionEngine::now(self)
    }
}

/// Reactive dispatch loop.
///
/// While started, every published snapshot triggers one pass: compute the
/// eligible set, order it by priority, and dispatch until capacity runs out.
/// The loop also wakes itself when the earliest future start time passes.
#[derive(Debug)]
pub struct Scheduler<D: DispatchTarget> {
    target: D,
    running: Mutex<Option<LoopHandle>>,
}

#[derive(Debug)]
struct LoopHandle {
    stop: oneshot::Sender<()>,
    gate: PassGate,
    join: JoinHandle<()>,
}

impl LoopHandle {
    /// Close the gate, then tear the loop down.
    ///
    /// Closing waits for a pass already in progress, so no dispatch happens
    /// after this returns.
    fn shutdown(self) {
        self.gate.close();
        let _ = self.stop.send(());
        self.join.abort();
    }
}

/// Open while the loop owning it may dispatch.
///
/// A pass runs with the gate locked.
#[derive(Clone, Debug)]
struct PassGate(Arc<Mutex<bool>>);

impl PassGate {
    fn open() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) {
        *self.lock() = false;
    }
}

impl<D: DispatchTarget> Scheduler<D> {
    pub fn new(target: D) -> Self {
        Self {
            target,
            running: Mutex::new(None),
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subscribe to the snapshot stream and start reacting to it.
    ///
    /// Idempotent: returns `false` and does nothing if the loop is already
    /// running. Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.running();
        if running.as_ref().is_some_and(|h| !h.join.is_finished()) {
            debug!("scheduler already running; start ignored");
            return false;
        }

        if let Some(stale) = running.take() {
            stale.shutdown();
        }

        let rx = self.target.tasks_stream();
        let (stop_tx, stop_rx) = oneshot::channel();
        let gate = PassGate::open();
        let join = tokio::spawn(run_loop(self.target.clone(), rx, stop_rx, gate.clone()));
        *running = Some(LoopHandle {
            stop: stop_tx,
            gate,
            join,
        });
        info!("scheduler started");
        true
    }

    /// Drop the subscription. A later [`start`](Self::start) resubscribes.
    ///
    /// Once this returns the old loop dispatches nothing more, even if a
    /// snapshot was already waiting for it.
    pub fn stop(&self) -> bool {
        match self.running().take() {
            Some(handle) => {
                handle.shutdown();
                info!("scheduler stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running()
            .as_ref()
            .is_some_and(|h| !h.join.is_finished())
    }

    /// Run one pass over `snapshot` right now.
    pub fn tick(&self, snapshot: &[Task]) -> SchedulerPass {
        run_pass(&self.target, snapshot)
    }
}

impl<D: DispatchTarget> Drop for Scheduler<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.running().take() {
            handle.shutdown();
        }
    }
}

/// One dispatch pass.
///
/// Capacity is checked before every individual dispatch, not once per pass,
/// because each started run consumes a slot.
pub fn run_pass<D: DispatchTarget>(target: &D, snapshot: &[Task]) -> SchedulerPass {
    let now = target.now();
    let view = EligibilityView::new(snapshot);
    let eligible = view.eligible_in_priority_order(now);

    let mut pass = SchedulerPass {
        eligible: eligible.iter().map(|t| t.id.clone()).collect(),
        next_wake: view.next_start_at(now),
        ..SchedulerPass::default()
    };

    for task in eligible {
        if !target.has_capacity() {
            trace!(task = %task.id, "no capacity left; ending pass");
            pass.capacity_exhausted = true;
            break;
        }
        if target.try_dispatch(&task.id) {
            pass.dispatched.push(task.id.clone());
        }
    }

    if !pass.dispatched.is_empty() {
        debug!(dispatched = ?pass.dispatched, "scheduler pass dispatched tasks");
    }
    pass
}

async fn run_loop<D: DispatchTarget>(
    target: D,
    mut rx: watch::Receiver<TaskSnapshot>,
    mut stop_rx: oneshot::Receiver<()>,
    gate: PassGate,
) {
    loop {
        let snapshot = rx.borrow_and_update().clone();
        let pass = {
            let open = gate.lock();
            if !*open {
                break;
            }
            run_pass(&target, &snapshot)
        };

        let wake = async {
            match pass.next_wake {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("task stream closed; scheduler loop exiting");
                    break;
                }
            }
            _ = wake => trace!("start time reached; re-evaluating"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// Records dispatches and consumes one slot per dispatch.
    #[derive(Clone, Debug)]
    struct Recorder {
        slots: usize,
        dispatched: Arc<Mutex<Vec<String>>>,
        tx: Arc<watch::Sender<TaskSnapshot>>,
        now: Instant,
    }

    impl Recorder {
        fn new(slots: usize) -> Self {
            let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
            Self {
                slots,
                dispatched: Arc::default(),
                tx: Arc::new(tx),
                now: Instant::now(),
            }
        }

        fn dispatched(&self) -> Vec<String> {
            self.dispatched.lock().unwrap().clone()
        }
    }

    impl DispatchTarget for Recorder {
        fn tasks_stream(&self) -> watch::Receiver<TaskSnapshot> {
            let mut rx = self.tx.subscribe();
            rx.mark_changed();
            rx
        }

        fn has_capacity(&self) -> bool {
            self.dispatched.lock().unwrap().len() < self.slots
        }

        fn try_dispatch(&self, id: &str) -> bool {
            self.dispatched.lock().unwrap().push(id.to_string());
            true
        }

        fn now(&self) -> Instant {
            self.now
        }
    }

    fn t(id: &str, priority: u8) -> Task {
        Task::new(id, id, priority, Duration::from_millis(10))
    }

    #[test]
    fn dispatches_in_priority_order() {
        let target = Recorder::new(3);
        let pass = run_pass(&target, &[t("p5", 5), t("p1", 1), t("p3", 3)]);
        assert_eq!(pass.dispatched, vec!["p1", "p3", "p5"]);
        assert!(!pass.capacity_exhausted);
    }

    #[test]
    fn stops_when_capacity_runs_out_mid_pass() {
        let target = Recorder::new(2);
        let pass = run_pass(&target, &[t("a", 2), t("b", 1), t("c", 3)]);
        assert_eq!(pass.eligible, vec!["b", "a", "c"]);
        assert_eq!(pass.dispatched, vec!["b", "a"]);
        assert!(pass.capacity_exhausted);
        assert_eq!(target.dispatched().len(), 2);
    }

    #[test]
    fn reports_next_wake_for_future_start() {
        let target = Recorder::new(3);
        let at = target.now + Duration::from_millis(50);
        let pass = run_pass(&target, &[t("later", 1).with_start_at(at)]);
        assert!(pass.dispatched.is_empty());
        assert_eq!(pass.next_wake, Some(at));
    }

    #[tokio::test]
    async fn closed_gate_ends_the_loop_before_any_pass() {
        let target = Recorder::new(3);
        target.tx.send_replace(Arc::new(vec![t("a", 1)]));
        let (_stop_tx, stop_rx) = oneshot::channel();
        let gate = PassGate::open();
        gate.close();

        run_loop(target.clone(), target.tasks_stream(), stop_rx, gate).await;
        assert!(target.dispatched().is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent_and_restartable() {
        let scheduler = Scheduler::new(Recorder::new(3));
        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(scheduler.start());
        assert!(scheduler.stop());
    }
}
