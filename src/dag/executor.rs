// src/dag/executor.rs

//! Drives a single [`WorkflowRun`] through the task graph.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::dag::state_manager::{ReadOnlyStateManager, Readiness, StateManager};
use crate::dag::task_info::{FailurePolicy, NodeStatus, TaskNode};
use crate::dag::TaskGraph;
use crate::engine::TriggerReason;
use crate::errors::TaskError;
use crate::exec::{NodeInvocation, NodeOutput, RetryPolicy, TaskHandler};
use crate::workflow::WorkflowRun;

/// Sequential graph executor.
///
/// Nodes are visited once, in topological order. When a node is visited all
/// of its upstream nodes are terminal, so its trigger rule decides right away
/// whether it runs or is skipped. Skips propagate because a skipped node makes
/// every edge leaving it inactive.
pub struct GraphExecutor<H> {
    graph: Arc<TaskGraph>,
    handler: H,
    retry: RetryPolicy,
}

impl<H: TaskHandler> GraphExecutor<H> {
    pub fn new(graph: Arc<TaskGraph>, handler: H, retry: RetryPolicy) -> Self {
        Self {
            graph,
            handler,
            retry,
        }
    }

    /// Create a fresh run for this executor's graph.
    pub fn new_run(&self, sequence: u64, reason: TriggerReason) -> WorkflowRun {
        WorkflowRun::new(&self.graph, sequence, reason)
    }

    /// Drive `run` until every node is terminal and return it in its
    /// terminal state.
    pub async fn execute(&self, mut run: WorkflowRun) -> WorkflowRun {
        let run_id = run.id();
        info!(
            run_id = %run_id,
            sequence = run.sequence(),
            reason = ?run.reason(),
            "workflow run started"
        );

        let mut aborted = run.aborted_by().is_some();

        for name in self.graph.topological_order() {
            let Some(node) = self.graph.node(name) else {
                continue;
            };
            if run.status_of(name) != Some(NodeStatus::Pending) {
                continue;
            }

            let readiness =
                ReadOnlyStateManager::new(&self.graph, run.record_map()).readiness(node, aborted);

            match readiness {
                Readiness::Skip(reason) => {
                    StateManager::new(run.records_mut(), run_id)
                        .transition(name, NodeStatus::Skipped);
                    info!(run_id = %run_id, node = %name, %reason, "node skipped");
                }
                Readiness::Ready => {
                    let status = self.run_node(&mut run, node).await;
                    if status == NodeStatus::Failed
                        && node.failure_policy() == FailurePolicy::AbortRun
                        && !aborted
                    {
                        aborted = true;
                        run.set_aborted_by(name);
                        error!(
                            run_id = %run_id,
                            node = %name,
                            "node failure is fatal; no further nodes will start except finalizers"
                        );
                    }
                }
            }
        }

        debug_assert!(
            StateManager::new(run.records_mut(), run_id).all_terminal(),
            "every node must be terminal after a full pass"
        );

        run.finish();

        let duration_ms = run.duration().map(|d| d.num_milliseconds());
        let failures = run.failures();
        if failures.is_empty() {
            info!(run_id = %run_id, status = %run.status(), ?duration_ms, "workflow run finished");
        } else {
            for failure in &failures {
                warn!(
                    run_id = %run_id,
                    node = %failure.node,
                    attempts = failure.attempts,
                    error_kind = failure.error.kind(),
                    error = %failure.error,
                    "node failed in this run"
                );
            }
            warn!(
                run_id = %run_id,
                status = %run.status(),
                ?duration_ms,
                failed_nodes = failures.len(),
                "workflow run finished with failures"
            );
        }

        run
    }

    /// Invoke one node with retries and record its terminal status.
    async fn run_node(&self, run: &mut WorkflowRun, node: &TaskNode) -> NodeStatus {
        let run_id = run.id();
        StateManager::new(run.records_mut(), run_id)
            .transition(node.name(), NodeStatus::Running);
        info!(run_id = %run_id, node = %node.name(), kind = %node.kind(), "node started");

        let attempted = {
            let run_ref: &WorkflowRun = run;
            self.retry
                .run(node.name(), |attempt| async move {
                    let output = self
                        .handler
                        .invoke(NodeInvocation::new(node, run_ref, attempt))
                        .await?;
                    check_output(node, output)
                })
                .await
        };

        let result = attempted.result.and_then(|output| {
            for (key, value) in output.writes.iter().cloned() {
                run.context_mut().insert(key, value)?;
            }
            Ok(output)
        });

        let status = match &result {
            Ok(_) => NodeStatus::Succeeded,
            Err(_) => NodeStatus::Failed,
        };

        if let Some(record) = run.records_mut().get_mut(node.name()) {
            record.attempts = attempted.attempts;
            match result {
                Ok(output) => record.selected = output.selected,
                Err(err) => record.last_error = Some(err),
            }
        }

        StateManager::new(run.records_mut(), run_id).transition(node.name(), status);

        match run.record(node.name()) {
            Some(record) if status == NodeStatus::Succeeded => info!(
                run_id = %run_id,
                node = %node.name(),
                attempts = record.attempts,
                selected = record.selected.map(|l| l.as_str()),
                "node succeeded"
            ),
            Some(record) => error!(
                run_id = %run_id,
                node = %node.name(),
                attempts = record.attempts,
                error = record.last_error.as_ref().map(|e| e.to_string()),
                "node failed after exhausting its attempts"
            ),
            None => {}
        }

        status
    }
}

/// Reject outputs that do not match the node's declaration.
fn check_output(node: &TaskNode, output: NodeOutput) -> Result<NodeOutput, TaskError> {
    for (key, _) in &output.writes {
        if !node.write_keys().contains(key) {
            return Err(TaskError::UndeclaredWrite(*key));
        }
    }
    for key in node.write_keys() {
        if !output.writes.iter().any(|(k, _)| k == key) {
            return Err(TaskError::MissingContext(*key));
        }
    }

    match (node.is_branch(), output.selected) {
        (true, Some(label)) if node.labels().any(|l| l == label) => Ok(output),
        (true, Some(label)) => Err(TaskError::InvalidOutcome(format!(
            "branch '{}' selected undeclared label '{}'",
            node.name(),
            label
        ))),
        (true, None) => Err(TaskError::InvalidOutcome(format!(
            "branch '{}' completed without selecting a label",
            node.name()
        ))),
        (false, Some(label)) => Err(TaskError::InvalidOutcome(format!(
            "action '{}' cannot select label '{}'",
            node.name(),
            label
        ))),
        (false, None) => Ok(output),
    }
}
