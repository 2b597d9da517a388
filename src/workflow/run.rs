// src/workflow/run.rs

//! One execution of the workflow, from trigger to terminal status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dag::{BranchLabel, NodeStatus, TaskGraph, TaskName};
use crate::engine::TriggerReason;
use crate::errors::TaskError;
use crate::workflow::context::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-run execution record of a single node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub status: NodeStatus,
    /// Number of invocations made (0 for skipped nodes).
    pub attempts: u32,
    pub last_error: Option<TaskError>,
    /// Label chosen by a branch node that succeeded.
    pub selected: Option<BranchLabel>,
}

impl NodeRecord {
    fn pending() -> Self {
        Self {
            status: NodeStatus::Pending,
            attempts: 0,
            last_error: None,
            selected: None,
        }
    }
}

/// A node that ended `Failed`, as reported by [`WorkflowRun::failures`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    pub node: TaskName,
    pub attempts: u32,
    pub error: TaskError,
}

/// Read-only view of the per-node records of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunRecords<'a> {
    records: &'a BTreeMap<TaskName, NodeRecord>,
}

impl<'a> RunRecords<'a> {
    pub fn record(&self, node: &str) -> Option<&'a NodeRecord> {
        self.records.get(node)
    }

    pub fn status_of(&self, node: &str) -> Option<NodeStatus> {
        self.records.get(node).map(|r| r.status)
    }

    pub fn failures(&self) -> Vec<RunFailure> {
        self.node_records().failures()
    }

    /// Why the run task died, if it never reached a terminal status on its
    /// own.
    pub fn panic_message(&self) -> Option<&str> {
        self.panicked.as_deref()
    }

    /// Wall-clock time from trigger to terminal status.
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        self.finished_at.map(|finished| finished - self.triggered_at)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowRun {
    id: Uuid,
    sequence: u64,
    reason: TriggerReason,
    triggered_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: RunStatus,
    context: RunContext,
    records: BTreeMap<TaskName, NodeRecord>,
    aborted_by: Option<TaskName>,
    panicked: Option<String>,
}

impl WorkflowRun {
    /// Create a run with every node of `graph` pending.
    pub fn new(graph: &TaskGraph, sequence: u64, reason: TriggerReason) -> Self {
        let records = graph
            .topological_order()
            .iter()
            .map(|name| (name.clone(), NodeRecord::pending()))
            .collect();

        Self {
            id: Uuid::new_v4(),
            sequence,
            reason,
            triggered_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            context: RunContext::new(),
            records,
            aborted_by: None,
            panicked: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Scheduler-assigned sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn reason(&self) -> TriggerReason {
        self.reason
    }

    pub fn triggered_at(&self) -> DateTime<Utc> {
        self.triggered_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn node_records(&self) -> RunRecords<'_> {
        RunRecords {
            records: &self.records,
        }
    }

    pub fn record(&self, node: &str) -> Option<&NodeRecord> {
        self.node_records().record(node)
    }

    pub fn status_of(&self, node: &str) -> Option<NodeStatus> {
        self.node_records().status_of(node)
    }

    pub fn selected_label(&self, node: &str) -> Option<BranchLabel> {
        self.records.get(node).and_then(|r| r.selected)
    }

    pub fn attempts_of(&self, node: &str) -> u32 {
        self.records.get(node).map(|r| r.attempts).unwrap_or(0)
    }

    /// Node whose failure aborted the run, if any.
    pub fn aborted_by(&self) -> Option<&str> {
        self.aborted_by.as_deref()
    }

    pub fn failures(&self) -> Vec<RunFailure> {
        self.node_records().failures()
    }

    /// Why the run task died, if it never reached a terminal status on its
    /// own.
    pub fn panic_message(&self) -> Option<&str> {
        self.panicked.as_deref()
    }

    /// Wall-clock time from trigger to terminal status.
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        self.finished_at.map(|finished| finished - self.triggered_at)
    }

    /// Names of nodes that were actually invoked (succeeded or failed), in
    /// name order.
    pub fn executed_nodes(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(_, r)| matches!(r.status, NodeStatus::Succeeded | NodeStatus::Failed))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub(crate) fn record_map(&self) -> &BTreeMap<TaskName, NodeRecord> {
        &self.records
    }

    pub(crate) fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    pub(crate) fn records_mut(&mut self) -> &mut BTreeMap<TaskName, NodeRecord> {
        &mut self.records
    }

    pub(crate) fn set_aborted_by(&mut self, node: &str) {
        if self.aborted_by.is_none() {
            self.aborted_by = Some(node.to_string());
        }
    }

    /// Close a run whose task died. Nodes that never settled are marked
    /// skipped and the run itself is failed.
    pub(crate) fn abandon(&mut self, message: String) {
        for record in self.records.values_mut() {
            if !record.status.is_terminal() {
                record.status = NodeStatus::Skipped;
            }
        }
        self.panicked = Some(message);
        self.finish();
    }

    /// Settle the terminal status and scrub secrets before archiving.
    pub(crate) fn finish(&mut self) {
        let any_failed = self
            .records
            .values()
            .any(|r| r.status == NodeStatus::Failed);

        self.status = if any_failed || self.panicked.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        self.finished_at = Some(Utc::now());
        self.context.scrub_secrets();
    }
}
