mod common;
use crate::common::builders::TaskBuilder;
use crate::common::{alerts_of, init_tracing, scripted_simulation, scripted_simulation_with, summaries, with_timeout};

use std::time::Duration;

use tokio::time::Instant;

use tasksim::alerts::AlertSeverity;
use tasksim::config::Settings;
use tasksim::dag::Scheduler;
use tasksim::exec::{RunDraw, ScriptedOutcomes};
use tasksim::types::TaskState;
use tasksim_test_utils::fake_dispatcher::RecordingDispatcher;

/// Let spawned tasks react without moving the clock.
async fn settle_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn dispatches_eligible_tasks_by_priority() {
    init_tracing();
    let target = RecordingDispatcher::new(3);
    target.publish(vec![
        TaskBuilder::new("p5").priority(5).build(),
        TaskBuilder::new("p1").priority(1).build(),
        TaskBuilder::new("p3").priority(3).build(),
    ]);

    let scheduler = Scheduler::new(target.clone());
    assert!(scheduler.start());
    settle_tasks().await;

    assert_eq!(target.dispatched(), vec!["p1", "p3", "p5"]);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn capacity_is_rechecked_before_each_dispatch() {
    init_tracing();
    let target = RecordingDispatcher::new(2);
    let tasks = vec![
        TaskBuilder::new("low").priority(4).build(),
        TaskBuilder::new("high").priority(1).build(),
        TaskBuilder::new("mid").priority(2).build(),
    ];
    target.publish(tasks.clone());

    let scheduler = Scheduler::new(target.clone());
    scheduler.start();
    settle_tasks().await;
    assert_eq!(target.dispatched(), vec!["high", "mid"]);

    // Freeing a slot and publishing lets the next one through.
    target.finish("high");
    let remaining: Vec<_> = tasks.into_iter().filter(|t| t.id != "high").collect();
    target.publish(remaining);
    settle_tasks().await;
    assert_eq!(target.dispatched(), vec!["high", "mid", "low"]);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_stop_unsubscribes() {
    init_tracing();
    let target = RecordingDispatcher::new(3);
    let scheduler = Scheduler::new(target.clone());

    assert!(scheduler.start());
    assert!(!scheduler.start());
    settle_tasks().await;
    assert_eq!(target.subscriber_count(), 1);

    target.publish(vec![TaskBuilder::new("a").build()]);
    settle_tasks().await;
    assert_eq!(target.dispatched(), vec!["a"]);

    assert!(scheduler.stop());
    settle_tasks().await;
    assert_eq!(target.subscriber_count(), 0);
    assert!(!scheduler.is_running());

    // Nothing reacts while stopped.
    target.publish(vec![TaskBuilder::new("b").build()]);
    settle_tasks().await;
    assert_eq!(target.dispatched(), vec!["a"]);

    // A fresh subscription picks up the current table.
    assert!(scheduler.start());
    settle_tasks().await;
    assert_eq!(target.subscriber_count(), 1);
    assert_eq!(target.dispatched(), vec!["a", "b"]);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_wins_over_a_snapshot_already_waiting() {
    init_tracing();
    for round in 0..100 {
        let target = RecordingDispatcher::new(3);
        let scheduler = Scheduler::new(target.clone());
        assert!(scheduler.start());
        settle_tasks().await;

        target.publish(vec![TaskBuilder::new("a").build()]);
        assert!(scheduler.stop());
        settle_tasks().await;

        assert!(target.dispatched().is_empty(), "round {round}: dispatched after stop");
        assert_eq!(target.subscriber_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn engine_tasks_stay_pending_when_stopped_right_after_add() {
    init_tracing();
    for round in 0..100 {
        let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Success));
        let engine = sim.engine();
        assert!(sim.start());
        settle_tasks().await;

        engine.add_task(TaskBuilder::new("a").build()).unwrap();
        assert!(sim.stop());
        settle_tasks().await;

        assert_eq!(
            engine.task("a").unwrap().state,
            TaskState::Pending,
            "round {round}: dispatched after stop"
        );
        assert_eq!(engine.active_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn quick_restart_keeps_a_single_loop() {
    init_tracing();
    let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Success));
    let engine = sim.engine();
    assert!(sim.start());
    settle_tasks().await;

    engine.add_task(TaskBuilder::new("a").priority(2).build()).unwrap();
    engine.add_task(TaskBuilder::new("b").priority(1).build()).unwrap();
    assert!(sim.stop());
    assert!(sim.start());
    with_timeout(sim.wait_until_settled()).await;
    sim.stop();

    let history = sim.alerts().history();
    let mut completed: Vec<_> = summaries(&history)
        .into_iter()
        .filter(|s| s.starts_with("Completed"))
        .collect();
    completed.sort();
    assert_eq!(completed, vec!["Completed A", "Completed B"]);
    assert!(
        alerts_of(&history, AlertSeverity::Info)
            .iter()
            .all(|e| !e.summary.starts_with("Retrying"))
    );
}

#[tokio::test(start_paused = true)]
async fn quick_restart_dispatches_each_task_once() {
    init_tracing();
    let target = RecordingDispatcher::new(3);
    let scheduler = Scheduler::new(target.clone());
    assert!(scheduler.start());
    settle_tasks().await;

    target.publish(vec![
        TaskBuilder::new("a").priority(2).build(),
        TaskBuilder::new("b").priority(1).build(),
    ]);
    assert!(scheduler.stop());
    assert!(scheduler.start());
    settle_tasks().await;

    assert_eq!(target.subscriber_count(), 1);
    assert_eq!(target.dispatched(), vec!["b", "a"]);

    target.publish(vec![TaskBuilder::new("c").build()]);
    settle_tasks().await;
    assert_eq!(target.dispatched(), vec!["b", "a", "c"]);
    assert_eq!(target.subscriber_count(), 1);
    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn future_start_is_never_dispatched_early() {
    init_tracing();
    let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Success));
    let engine = sim.engine();
    let start_at = Instant::now() + Duration::from_millis(100);
    engine
        .add_task(TaskBuilder::new("later").priority(1).start_at(start_at).build())
        .unwrap();
    engine.add_task(TaskBuilder::new("now").priority(5).build()).unwrap();

    sim.start();
    tokio::time::sleep(Duration::from_millis(99)).await;
    assert_eq!(engine.task("later").unwrap().state, TaskState::Pending);
    assert_eq!(engine.task("now").unwrap().state, TaskState::Completed);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(engine.task("later").unwrap().state, TaskState::InProgress);

    with_timeout(sim.wait_until_settled()).await;
    assert_eq!(engine.task("later").unwrap().state, TaskState::Completed);
    sim.stop();
}

#[tokio::test(start_paused = true)]
async fn dependents_wait_for_completion() {
    init_tracing();
    let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Success));
    let engine = sim.engine();
    let a = TaskBuilder::new("a").priority(5).build();
    let b = TaskBuilder::new("b").priority(1).after(&a).build();
    engine.add_task(a.clone()).unwrap();
    engine.add_task(b.clone()).unwrap();
    engine
        .add_task(TaskBuilder::new("c").priority(1).after(&b).build())
        .unwrap();

    // Every published table must respect the dependency order.
    let mut rx = engine.tasks_stream();
    let watcher = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let state_of = |id: &str| snapshot.iter().find(|t| t.id == id).map(|t| t.state);
            if state_of("b") == Some(TaskState::InProgress) {
                assert_eq!(state_of("a"), Some(TaskState::Completed));
            }
            if state_of("c") == Some(TaskState::InProgress) {
                assert_eq!(state_of("b"), Some(TaskState::Completed));
            }
        }
    });

    sim.start();
    with_timeout(sim.wait_until_settled()).await;
    sim.stop();

    let successes: Vec<_> = alerts_of(&sim.alerts().history(), AlertSeverity::Success)
        .into_iter()
        .map(|e| e.summary)
        .collect();
    assert_eq!(successes, vec!["Completed A", "Completed B", "Completed C"]);

    watcher.abort();
    if let Err(err) = watcher.await {
        assert!(err.is_cancelled(), "snapshot watcher panicked: {err}");
    }
}

#[tokio::test(start_paused = true)]
async fn never_more_than_max_concurrency_in_flight() {
    init_tracing();
    let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Success));
    let engine = sim.engine();
    for i in 0..8 {
        engine
            .add_task(TaskBuilder::new(&format!("t{i}")).priority((i % 5 + 1) as u8).build())
            .unwrap();
    }

    let mut rx = engine.tasks_stream();
    let watcher = tokio::spawn(async move {
        let mut peak = 0;
        while rx.changed().await.is_ok() {
            let running = rx
                .borrow_and_update()
                .iter()
                .filter(|t| t.state == TaskState::InProgress)
                .count();
            peak = peak.max(running);
        }
        peak
    });

    sim.start();
    with_timeout(sim.wait_until_settled()).await;
    sim.stop();
    assert_eq!(sim.summary().completed, 8);

    drop(sim);
    let peak = with_timeout(watcher).await.unwrap();
    assert_eq!(peak, 3);
}

#[tokio::test(start_paused = true)]
async fn failing_tasks_retry_then_settle_as_failed() {
    init_tracing();
    let sim = scripted_simulation(ScriptedOutcomes::always(RunDraw::Failure));
    let engine = sim.engine();
    engine.add_task(TaskBuilder::new("a").build()).unwrap();
    engine.add_task(TaskBuilder::new("b").build()).unwrap();

    sim.start();
    with_timeout(sim.wait_until_settled()).await;
    sim.stop();

    for task in sim.snapshot().iter() {
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.retries, 2);
    }
    let history = sim.alerts().history();
    assert_eq!(alerts_of(&history, AlertSeverity::Error).len(), 2);
    let retries = summaries(&history)
        .into_iter()
        .filter(|s| s.starts_with("Retrying"))
        .count();
    assert_eq!(retries, 4);
}

#[tokio::test(start_paused = true)]
async fn single_slot_serializes_runs() {
    init_tracing();
    let settings = Settings {
        max_concurrency: 1,
        ..Settings::default()
    };
    let sim = scripted_simulation_with(&settings, ScriptedOutcomes::always(RunDraw::Success));
    let engine = sim.engine();
    for id in ["a", "b", "c"] {
        engine.add_task(TaskBuilder::new(id).duration_ms(20).build()).unwrap();
    }

    let started = Instant::now();
    sim.start();
    with_timeout(sim.wait_until_settled()).await;
    sim.stop();

    assert_eq!(sim.summary().completed, 3);
    assert!(started.elapsed() >= Duration::from_millis(60));
}
