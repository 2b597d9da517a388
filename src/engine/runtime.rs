// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::history::RunHistory;
use crate::engine::launcher::RunLauncher;
use crate::errors::Result;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduling core in response to `RuntimeEvent`s,
/// and delegates starting runs to a `RunLauncher`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. This struct handles async IO: reading events from
/// channels and launching runs.
pub struct Runtime<L: RunLauncher> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    launcher: L,
}

impl<L: RunLauncher> fmt::Debug for Runtime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<L: RunLauncher> Runtime<L> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, launcher: L) -> Self {
        Self {
            core,
            event_rx,
            launcher,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (start runs, exit).
    ///
    /// Returns the history of finished runs.
    pub async fn run(mut self) -> Result<RunHistory> {
        info!("retraindag runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            match &event {
                RuntimeEvent::RunFinished { run } => {
                    debug!(sequence = run.sequence(), status = %run.status(), "runtime received run completion")
                }
                other => debug!(event = ?other, "runtime received event"),
            }

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.core.into_history())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRun { sequence, reason } => {
                debug!(sequence, %reason, "launching workflow run");
                self.launcher.launch(sequence, reason).await?;
            }
            CoreCommand::RequestExit => {
                // keep_running is already false alongside this command.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}
