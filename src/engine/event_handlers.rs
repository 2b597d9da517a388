// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::engine::history::RunHistory;
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TriggerReason};
use crate::workflow::{RunStatus, WorkflowRun};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start a new workflow run.
    StartRun { sequence: u64, reason: TriggerReason },
    /// Request that the process exits (used for `--once` and shutdown).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn exit() -> Self {
        Self {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        }
    }
}

/// Which run (if any) is active, and the next sequence number to hand out.
#[derive(Debug, Default)]
pub struct RunSlot {
    pub active: Option<u64>,
    pub next_sequence: u64,
    /// Set once shutdown was requested; no new runs start afterwards.
    pub draining: bool,
}

impl RunSlot {
    fn start(&mut self, reason: TriggerReason) -> CoreCommand {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.active = Some(sequence);
        info!(sequence, %reason, "starting workflow run");
        CoreCommand::StartRun { sequence, reason }
    }
}

/// Handle a tick.
///
/// - If no run is active, start one.
/// - Otherwise honour the overlap behaviour (reject or queue).
pub fn handle_tick(slot: &mut RunSlot, queue: &mut TriggerQueue, reason: TriggerReason) -> CoreStep {
    if slot.draining {
        info!(%reason, "shutdown in progress; ignoring trigger");
        return CoreStep::keep(Vec::new());
    }

    match slot.active {
        None => CoreStep::keep(vec![slot.start(reason)]),
        Some(active) => {
            let queued = queue.record_trigger(reason);
            info!(active_sequence = active, %reason, queued, "trigger arrived while a run is active");
            CoreStep::keep(Vec::new())
        }
    }
}

/// Handle the completion of a run.
///
/// Archives the run, then starts the next queued trigger, or exits when the
/// runtime is draining or running in `--once` mode.
pub fn handle_run_finished(
    slot: &mut RunSlot,
    queue: &mut TriggerQueue,
    history: &mut RunHistory,
    options: &RuntimeOptions,
    run: WorkflowRun,
) -> CoreStep {
    if slot.active != Some(run.sequence()) {
        warn!(
            sequence = run.sequence(),
            active = ?slot.active,
            "completion for a run that is not active; archiving anyway"
        );
    } else {
        slot.active = None;
    }

    let status = run.status();
    let failed_nodes = run.failures().len();
    match status {
        RunStatus::Failed => warn!(
            run_id = %run.id(),
            sequence = run.sequence(),
            %status,
            failed_nodes,
            "workflow run archived"
        ),
        _ => info!(
            run_id = %run.id(),
            sequence = run.sequence(),
            %status,
            "workflow run archived"
        ),
    }
    history.push(run);

    if slot.active.is_some() {
        return CoreStep::keep(Vec::new());
    }

    if slot.draining {
        info!("active run finished; completing shutdown");
        return CoreStep::exit();
    }

    if let Some(reason) = queue.pop_next() {
        return CoreStep::keep(vec![slot.start(reason)]);
    }

    if options.exit_when_idle {
        return CoreStep::exit();
    }

    CoreStep::keep(Vec::new())
}

/// Handle a shutdown request: exit right away when idle, otherwise let the
/// active run finish first.
pub fn handle_shutdown(slot: &mut RunSlot, queue: &mut TriggerQueue) -> CoreStep {
    queue.clear();

    match slot.active {
        None => CoreStep::exit(),
        Some(sequence) => {
            info!(sequence, "shutdown requested; waiting for the active run to finish");
            slot.draining = true;
            CoreStep::keep(Vec::new())
        }
    }
}
