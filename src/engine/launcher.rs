// src/engine/launcher.rs

//! Pluggable run launcher abstraction.
//!
//! The runtime talks to a `RunLauncher` instead of owning the graph executor
//! directly. This makes it easy to swap in a fake launcher in tests while
//! keeping the production wiring in [`ExecutorLauncher`].
//!
//! Whatever the implementation, it must eventually send a
//! [`RuntimeEvent::RunFinished`] for every launched run, or the runtime will
//! consider the run active forever. [`ExecutorLauncher`] reports a failed run
//! even when the run task panics.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::error;

use crate::dag::GraphExecutor;
use crate::engine::{RuntimeEvent, TriggerReason};
use crate::errors::Result;
use crate::exec::TaskHandler;

/// Trait abstracting how a workflow run is started.
pub trait RunLauncher: Send {
    fn launch(
        &mut self,
        sequence: u64,
        reason: TriggerReason,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production launcher: executes the run on a Tokio task and reports the
/// terminal run back over the runtime channel.
pub struct ExecutorLauncher<H> {
    executor: Arc<GraphExecutor<H>>,
    tx: mpsc::Sender<RuntimeEvent>,
}

impl<H> ExecutorLauncher<H> {
    pub fn new(executor: Arc<GraphExecutor<H>>, tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { executor, tx }
    }
}

impl<H: TaskHandler + 'static> RunLauncher for ExecutorLauncher<H> {
    fn launch(
        &mut self,
        sequence: u64,
        reason: TriggerReason,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone so the spawned task does not borrow `self`.
        let executor = Arc::clone(&self.executor);
        let tx = self.tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let run = executor.new_run(sequence, reason);
                let fallback = run.clone();

                let task = tokio::spawn(async move { executor.execute(run).await });
                let run = match task.await {
                    Ok(run) => run,
                    Err(e) => {
                        error!(
                            sequence,
                            run_id = %fallback.id(),
                            error = %e,
                            "workflow run task died; reporting the run as failed"
                        );
                        let mut run = fallback;
                        run.abandon(e.to_string());
                        run
                    }
                };

                if tx
                    .send(RuntimeEvent::RunFinished { run: Box::new(run) })
                    .await
                    .is_err()
                {
                    error!(sequence, "runtime channel closed before run completion was reported");
                }
            });
            Ok(())
        })
    }
}
