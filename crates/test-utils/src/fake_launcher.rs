use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use retraindag::dag::{GraphExecutor, TaskGraph, TaskNode};
use retraindag::engine::{RunLauncher, RuntimeEvent, TriggerReason};
use retraindag::errors::Result;
use retraindag::exec::RetryPolicy;
use retraindag::workflow::WorkflowRun;

use crate::scripted_handler::ScriptedHandler;

fn single_node_executor() -> GraphExecutor<ScriptedHandler> {
    let graph = TaskGraph::builder()
        .node(TaskNode::action("only"))
        .build()
        .expect("single node graph is valid");
    GraphExecutor::new(Arc::new(graph), ScriptedHandler::new(), RetryPolicy::no_retry())
}

/// A terminal, successful run with the given sequence number.
pub async fn finished_run(sequence: u64, reason: TriggerReason) -> WorkflowRun {
    let executor = single_node_executor();
    let run = executor.new_run(sequence, reason);
    executor.execute(run).await
}

/// A fake launcher that:
/// - records which runs were launched
/// - optionally reports each run as finished right away.
///
/// With `auto_finish = false` the test decides when to send
/// `RunFinished` itself, which makes overlap behaviour observable.
pub struct FakeLauncher {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    launched: Arc<Mutex<Vec<(u64, TriggerReason)>>>,
    auto_finish: bool,
}

impl FakeLauncher {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        launched: Arc<Mutex<Vec<(u64, TriggerReason)>>>,
        auto_finish: bool,
    ) -> Self {
        Self {
            runtime_tx,
            launched,
            auto_finish,
        }
    }
}

impl RunLauncher for FakeLauncher {
    fn launch(
        &mut self,
        sequence: u64,
        reason: TriggerReason,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let launched = Arc::clone(&self.launched);
        let auto_finish = self.auto_finish;

        Box::pin(async move {
            launched.lock().unwrap().push((sequence, reason));

            if auto_finish {
                let run = finished_run(sequence, reason).await;
                tx.send(RuntimeEvent::RunFinished { run: Box::new(run) })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
