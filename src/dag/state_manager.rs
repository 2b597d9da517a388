// src/dag/state_manager.rs

//! Per-run node state transitions and trigger-rule evaluation.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dag::task_info::{NodeStatus, TaskName, TaskNode, TriggerRule};
use crate::dag::TaskGraph;
use crate::workflow::NodeRecord;

/// Whether a pending node should be invoked or skipped.
///
/// The executor walks nodes in topological order, so by the time a node is
/// evaluated every upstream node is already terminal and there is no
/// "wait" case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// An upstream node failed or was skipped (`AllSuccess`).
    UpstreamInactive(TaskName),
    /// An upstream branch selected a label that does not lead here.
    BranchNotSelected(TaskName),
    /// No upstream edge is active (`AnySuccess`).
    NoActiveUpstream,
    /// A node with `AbortRun` failed earlier in this run.
    RunAborted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UpstreamInactive(up) => write!(f, "upstream '{up}' did not succeed"),
            SkipReason::BranchNotSelected(up) => {
                write!(f, "branch '{up}' selected a different path")
            }
            SkipReason::NoActiveUpstream => f.write_str("no upstream path succeeded"),
            SkipReason::RunAborted => f.write_str("run aborted"),
        }
    }
}

/// Manages per-run status transitions for nodes.
pub struct StateManager<'a> {
    records: &'a mut BTreeMap<TaskName, NodeRecord>,
    run_id: Uuid,
}

impl<'a> StateManager<'a> {
    pub fn new(records: &'a mut BTreeMap<TaskName, NodeRecord>, run_id: Uuid) -> Self {
        Self { records, run_id }
    }

    /// Move `node` to `next`, refusing anything that is not a forward
    /// transition. Returns whether the transition was applied.
    pub fn transition(&mut self, node: &str, next: NodeStatus) -> bool {
        let Some(record) = self.records.get_mut(node) else {
            warn!(run_id = %self.run_id, node = %node, "transition for unknown node; ignoring");
            return false;
        };

        if !record.status.can_transition_to(next) {
            warn!(
                run_id = %self.run_id,
                node = %node,
                from = %record.status,
                to = %next,
                "rejected non-monotonic status transition"
            );
            return false;
        }

        debug!(
            run_id = %self.run_id,
            node = %node,
            from = %record.status,
            to = %next,
            "node status transition"
        );
        record.status = next;
        true
    }

    /// Check if all nodes are in a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.records.values().all(|r| r.status.is_terminal())
    }
}

/// A read-only view for evaluating trigger rules.
pub struct ReadOnlyStateManager<'a> {
    graph: &'a TaskGraph,
    records: &'a BTreeMap<TaskName, NodeRecord>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a TaskGraph, records: &'a BTreeMap<TaskName, NodeRecord>) -> Self {
        Self { graph, records }
    }

    /// Whether the edge `upstream -> node` carries success for this run.
    pub fn edge_active(&self, upstream: &str, node: &str) -> Result<(), SkipReason> {
        let Some(record) = self.records.get(upstream) else {
            return Err(SkipReason::UpstreamInactive(upstream.to_string()));
        };

        if record.status != NodeStatus::Succeeded {
            return Err(SkipReason::UpstreamInactive(upstream.to_string()));
        }

        let Some(up_node) = self.graph.node(upstream) else {
            return Err(SkipReason::UpstreamInactive(upstream.to_string()));
        };

        if up_node.is_branch() {
            let on_selected_path = record
                .selected
                .and_then(|label| up_node.targets_of(label))
                .is_some_and(|targets| targets.iter().any(|t| t == node));
            if !on_selected_path {
                return Err(SkipReason::BranchNotSelected(upstream.to_string()));
            }
        }

        Ok(())
    }

    pub fn readiness(&self, node: &TaskNode, aborted: bool) -> Readiness {
        let rule = node.trigger();

        if aborted && rule != TriggerRule::AllDone {
            return Readiness::Skip(SkipReason::RunAborted);
        }

        if node.deps().is_empty() {
            return Readiness::Ready;
        }

        match rule {
            TriggerRule::AllSuccess => {
                for dep in node.deps() {
                    if let Err(reason) = self.edge_active(dep, node.name()) {
                        return Readiness::Skip(reason);
                    }
                }
                Readiness::Ready
            }
            TriggerRule::AnySuccess => {
                if node
                    .deps()
                    .iter()
                    .any(|dep| self.edge_active(dep, node.name()).is_ok())
                {
                    Readiness::Ready
                } else {
                    Readiness::Skip(SkipReason::NoActiveUpstream)
                }
            }
            TriggerRule::AllDone => Readiness::Ready,
        }
    }
}
