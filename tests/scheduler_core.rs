// tests/scheduler_core.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use retraindag::dag::{GraphExecutor, NodeStatus, TaskGraph, TaskNode};
use retraindag::engine::{
    CoreCommand, CoreRuntime, ExecutorLauncher, RunLauncher, Runtime, RuntimeEvent,
    RuntimeOptions, TriggerReason,
};
use retraindag::exec::RetryPolicy;
use retraindag::types::OverlapBehaviour;
use retraindag::workflow::RunStatus;
use retraindag_test_utils::{FakeLauncher, Script, ScriptedHandler, finished_run};

fn core(behaviour: OverlapBehaviour, queue_length: usize, history_length: usize) -> CoreRuntime {
    CoreRuntime::new(
        behaviour,
        queue_length,
        history_length,
        RuntimeOptions {
            exit_when_idle: false,
        },
    )
}

fn tick(reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::Tick { reason }
}

async fn finished(sequence: u64, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::RunFinished {
        run: Box::new(finished_run(sequence, reason).await),
    }
}

#[test]
fn first_tick_starts_run_one() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Reject, 1, 16);

    let step = core.step(tick(TriggerReason::Startup));

    assert!(step.keep_running);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 1,
            reason: TriggerReason::Startup
        }]
    );
    assert_eq!(core.active_sequence(), Some(1));
}

#[tokio::test]
async fn reject_mode_drops_overlapping_ticks() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Reject, 4, 16);

    core.step(tick(TriggerReason::Startup));
    let step = core.step(tick(TriggerReason::Interval));
    assert!(step.commands.is_empty());
    assert!(core.queue_is_empty());

    let step = core.step(finished(1, TriggerReason::Startup).await);
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    assert!(core.is_idle());
    assert_eq!(core.history().len(), 1);

    // The next tick gets a fresh sequence number.
    let step = core.step(tick(TriggerReason::Interval));
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 2,
            reason: TriggerReason::Interval
        }]
    );
}

#[tokio::test]
async fn queue_mode_runs_queued_triggers_one_at_a_time() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Queue, 2, 16);

    core.step(tick(TriggerReason::Startup));
    core.step(tick(TriggerReason::Interval));
    core.step(tick(TriggerReason::Manual));
    assert_eq!(core.queued(), 2);

    let step = core.step(finished(1, TriggerReason::Startup).await);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 2,
            reason: TriggerReason::Interval
        }]
    );
    assert_eq!(core.active_sequence(), Some(2));
    assert_eq!(core.queued(), 1);

    let step = core.step(finished(2, TriggerReason::Interval).await);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 3,
            reason: TriggerReason::Manual
        }]
    );

    let step = core.step(finished(3, TriggerReason::Manual).await);
    assert!(step.commands.is_empty());
    assert!(core.is_idle());
}

#[tokio::test]
async fn full_queue_drops_the_oldest_trigger() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Queue, 1, 16);

    core.step(tick(TriggerReason::Startup));
    core.step(tick(TriggerReason::Interval));
    core.step(tick(TriggerReason::Manual));
    assert_eq!(core.queued(), 1);

    let step = core.step(finished(1, TriggerReason::Startup).await);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 2,
            reason: TriggerReason::Manual
        }]
    );
}

#[tokio::test]
async fn history_keeps_only_the_most_recent_runs() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Reject, 1, 2);

    for sequence in 1..=3 {
        core.step(tick(TriggerReason::Interval));
        core.step(finished(sequence, TriggerReason::Interval).await);
    }

    let history = core.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.capacity(), 2);
    let sequences: Vec<u64> = history.iter().map(|r| r.sequence()).collect();
    assert_eq!(sequences, vec![2, 3]);
    assert_eq!(history.latest().map(|r| r.sequence()), Some(3));
}

#[tokio::test]
async fn shutdown_waits_for_the_active_run() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Queue, 4, 16);

    core.step(tick(TriggerReason::Startup));
    core.step(tick(TriggerReason::Interval));

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(step.keep_running);
    assert!(step.commands.is_empty());
    assert!(core.queue_is_empty());

    // Triggers during draining are ignored.
    let step = core.step(tick(TriggerReason::Interval));
    assert!(step.commands.is_empty());
    assert!(core.queue_is_empty());

    let step = core.step(finished(1, TriggerReason::Startup).await);
    assert!(!step.keep_running);
    assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    assert_eq!(core.history().len(), 1);
}

#[test]
fn shutdown_when_idle_exits_immediately() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Reject, 1, 16);

    let step = core.step(RuntimeEvent::ShutdownRequested);

    assert!(!step.keep_running);
    assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
}

#[tokio::test]
async fn stale_completion_is_archived_without_freeing_the_slot() {
    init_tracing();
    let mut core = core(OverlapBehaviour::Reject, 1, 16);

    core.step(tick(TriggerReason::Startup));
    let step = core.step(finished(99, TriggerReason::Manual).await);

    assert!(step.commands.is_empty());
    assert_eq!(core.active_sequence(), Some(1));
    assert_eq!(core.history().len(), 1);
}

#[tokio::test]
async fn runtime_exits_after_single_run_in_once_mode() {
    init_tracing();
    let (tx, rx) = mpsc::channel(16);
    let launched = Arc::new(Mutex::new(Vec::new()));
    let launcher = FakeLauncher::new(tx.clone(), Arc::clone(&launched), true);

    let core = CoreRuntime::new(
        OverlapBehaviour::Reject,
        1,
        16,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    tx.send(tick(TriggerReason::Manual)).await.unwrap();

    let history = with_timeout(Runtime::new(core, rx, launcher).run())
        .await
        .expect("runtime finishes cleanly");

    assert_eq!(
        launched.lock().unwrap().clone(),
        vec![(1, TriggerReason::Manual)]
    );
    assert_eq!(history.len(), 1);
    assert_eq!(history.latest().map(|r| r.sequence()), Some(1));
}

#[tokio::test]
async fn runtime_drains_on_shutdown() {
    init_tracing();
    let (tx, rx) = mpsc::channel(16);
    let launched = Arc::new(Mutex::new(Vec::new()));
    let launcher = FakeLauncher::new(tx.clone(), Arc::clone(&launched), false);

    let core = CoreRuntime::new(
        OverlapBehaviour::Reject,
        1,
        16,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let handle = tokio::spawn(Runtime::new(core, rx, launcher).run());

    tx.send(tick(TriggerReason::Startup)).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    tx.send(tick(TriggerReason::Interval)).await.unwrap();
    tx.send(finished(1, TriggerReason::Startup).await)
        .await
        .unwrap();

    let history = with_timeout(handle)
        .await
        .expect("runtime task joins")
        .expect("runtime finishes cleanly");

    assert_eq!(
        launched.lock().unwrap().clone(),
        vec![(1, TriggerReason::Startup)]
    );
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn runtime_stops_when_the_channel_closes() {
    init_tracing();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    // The launcher reports into a channel nobody reads.
    let (launcher_tx, _launcher_rx) = mpsc::channel(16);
    let launched = Arc::new(Mutex::new(Vec::new()));
    let launcher = FakeLauncher::new(launcher_tx, Arc::clone(&launched), false);
    drop(tx);

    let core = CoreRuntime::new(
        OverlapBehaviour::Reject,
        1,
        16,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let history = with_timeout(Runtime::new(core, rx, launcher).run())
        .await
        .expect("runtime finishes cleanly");

    assert!(history.is_empty());
    assert!(launched.lock().unwrap().is_empty());
}

#[tokio::test]
async fn panicking_run_is_reported_as_failed_and_frees_the_slot() {
    init_tracing();
    let graph = TaskGraph::builder()
        .node(TaskNode::action("boom"))
        .build()
        .expect("single node graph is valid");
    let handler = ScriptedHandler::new().script("boom", Script::Panic);
    let executor = Arc::new(GraphExecutor::new(
        Arc::new(graph),
        handler,
        RetryPolicy::no_retry(),
    ));

    let (tx, mut rx) = mpsc::channel(16);
    let mut launcher = ExecutorLauncher::new(executor, tx);
    let mut core = core(OverlapBehaviour::Reject, 1, 16);

    core.step(tick(TriggerReason::Startup));
    launcher
        .launch(1, TriggerReason::Startup)
        .await
        .expect("launch succeeds");

    let event = with_timeout(rx.recv()).await.expect("run is reported");
    let RuntimeEvent::RunFinished { run } = &event else {
        panic!("expected RunFinished, got {event:?}");
    };
    assert_eq!(run.sequence(), 1);
    assert_eq!(run.status(), RunStatus::Failed);
    assert!(run.panic_message().is_some());
    assert_eq!(run.status_of("boom"), Some(NodeStatus::Skipped));

    core.step(event);
    assert!(core.is_idle());
    let step = core.step(tick(TriggerReason::Interval));
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            sequence: 2,
            reason: TriggerReason::Interval
        }]
    );
}
