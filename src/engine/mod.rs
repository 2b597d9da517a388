// src/engine/mod.rs

//! Scheduling engine for retraindag.
//!
//! This module ties together:
//! - the interval ticker that produces triggers
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the bounded history of finished runs
//! - the main runtime event loop that reacts to:
//!   - ticks
//!   - run completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use crate::workflow::WorkflowRun;

/// Why a workflow run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Immediate run at process start (`run_on_startup`).
    Startup,
    /// Regular interval tick.
    Interval,
    /// Explicit request, e.g. `--once`.
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerReason::Startup => "startup",
            TriggerReason::Interval => "interval",
            TriggerReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no run is active and nothing is
    /// queued (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the ticker, launcher, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A new workflow run should start.
    Tick { reason: TriggerReason },
    /// A workflow run reached its terminal status.
    RunFinished { run: Box<WorkflowRun> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod history;
pub mod launcher;
pub mod queue;
pub mod runtime;
pub mod ticker;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use history::RunHistory;
pub use launcher::{ExecutorLauncher, RunLauncher};
pub use queue::TriggerQueue;
pub use crate::types::OverlapBehaviour;
pub use runtime::Runtime;
pub use ticker::spawn_ticker;
