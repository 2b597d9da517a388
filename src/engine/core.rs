// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - launching workflow runs
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels or network.

use crate::engine::event_handlers::{
    handle_run_finished, handle_shutdown, handle_tick, CoreStep, RunSlot,
};
use crate::engine::history::RunHistory;
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::OverlapBehaviour;

/// Pure core runtime state.
///
/// This owns:
/// - the active-run slot (at most one run at a time)
/// - the trigger queue
/// - the history of finished runs
/// - runtime options (e.g. `exit_when_idle`)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    slot: RunSlot,
    queue: TriggerQueue,
    history: RunHistory,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        behaviour: OverlapBehaviour,
        queue_length: usize,
        history_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            slot: RunSlot::default(),
            queue: TriggerQueue::new(behaviour, queue_length),
            history: RunHistory::new(history_length),
            options,
        }
    }

    /// Whether no run is active.
    pub fn is_idle(&self) -> bool {
        self.slot.active.is_none()
    }

    /// Sequence number of the active run, if any.
    pub fn active_sequence(&self) -> Option<u64> {
        self.slot.active
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn into_history(self) -> RunHistory {
        self.history
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Tick { reason } => handle_tick(&mut self.slot, &mut self.queue, reason),
            RuntimeEvent::RunFinished { run } => handle_run_finished(
                &mut self.slot,
                &mut self.queue,
                &mut self.history,
                &self.options,
                *run,
            ),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.slot, &mut self.queue),
        }
    }
}
