// src/exec/backend.rs

//! Pluggable task handler abstraction.
//!
//! The graph executor talks to a `TaskHandler` instead of knowing what any
//! node actually does. Production code uses
//! [`MaintenanceTasks`](crate::maintenance::MaintenanceTasks), which maps
//! nodes onto remote API calls; tests can provide their own handler that
//! records invocations and returns scripted outputs.

use std::future::Future;
use std::pin::Pin;

use uuid::Uuid;

use crate::dag::{BranchLabel, TaskNode};
use crate::errors::TaskError;
use crate::workflow::{ContextKey, ContextValue, RunContext, RunRecords, WorkflowRun};

/// Everything a handler may look at while executing one attempt of a node.
///
/// Context values are only reachable through the read methods below, which
/// fail with [`TaskError::UndeclaredRead`] for keys the node did not
/// declare. Writes are reported through [`NodeOutput`] and applied by the
/// executor once the attempt succeeded.
#[derive(Debug, Clone, Copy)]
pub struct NodeInvocation<'a> {
    pub node: &'a TaskNode,
    /// 1-based attempt number.
    pub attempt: u32,
    run_id: Uuid,
    context: &'a RunContext,
    records: RunRecords<'a>,
}

impl<'a> NodeInvocation<'a> {
    pub(crate) fn new(node: &'a TaskNode, run: &'a WorkflowRun, attempt: u32) -> Self {
        Self {
            node,
            attempt,
            run_id: run.id(),
            context: run.context(),
            records: run.node_records(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Per-node records of the run so far.
    pub fn records(&self) -> RunRecords<'a> {
        self.records
    }

    /// Raw context value for a declared key, `None` if not written yet.
    pub fn read(&self, key: ContextKey) -> Result<Option<&'a ContextValue>, TaskError> {
        self.ensure_declared(key)?;
        Ok(self.context.get(key))
    }

    /// Bearer token written by the token node.
    pub fn token(&self) -> Result<&'a str, TaskError> {
        self.ensure_declared(ContextKey::Token)?;
        self.context.token()
    }

    /// Accuracy stored under `key`, failing if it is absent.
    pub fn require_accuracy(&self, key: ContextKey) -> Result<f64, TaskError> {
        self.ensure_declared(key)?;
        self.context.require_accuracy(key)
    }

    /// Accuracy stored under `key`, if its producer ran.
    pub fn accuracy(&self, key: ContextKey) -> Result<Option<f64>, TaskError> {
        self.ensure_declared(key)?;
        Ok(self.context.accuracy(key))
    }

    fn ensure_declared(&self, key: ContextKey) -> Result<(), TaskError> {
        if self.node.may_read(key) {
            Ok(())
        } else {
            Err(TaskError::UndeclaredRead(key))
        }
    }
}

/// Result of a successful node invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutput {
    pub writes: Vec<(ContextKey, ContextValue)>,
    pub selected: Option<BranchLabel>,
}

impl NodeOutput {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn write(mut self, key: ContextKey, value: ContextValue) -> Self {
        self.writes.push((key, value));
        self
    }

    pub fn select(mut self, label: BranchLabel) -> Self {
        self.selected = Some(label);
        self
    }
}

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<NodeOutput, TaskError>> + Send + 'a>>;

/// Trait abstracting how a single node attempt is executed.
pub trait TaskHandler: Send + Sync {
    fn invoke<'a>(&'a self, invocation: NodeInvocation<'a>) -> TaskFuture<'a>;
}
