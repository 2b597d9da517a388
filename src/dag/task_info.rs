// src/dag/task_info.rs

//! Static node definitions and per-run node status.

use std::fmt;

use crate::workflow::ContextKey;

/// Canonical task name type used throughout the graph and executor.
pub type TaskName = String;

/// Closed set of outcome labels a branch node may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchLabel {
    Backup,
    Noop,
    Commit,
    Rollback,
}

impl BranchLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchLabel::Backup => "backup",
            BranchLabel::Noop => "noop",
            BranchLabel::Commit => "commit",
            BranchLabel::Rollback => "rollback",
        }
    }
}

impl fmt::Display for BranchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a node is allowed to start, given the outcome of its upstream nodes.
///
/// An upstream edge is *active* when the upstream node succeeded and, for a
/// branch upstream, this node is a target of the selected label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerRule {
    /// Every upstream edge is active.
    #[default]
    AllSuccess,
    /// At least one upstream edge is active.
    AnySuccess,
    /// Every upstream node is terminal, whatever its outcome. Such nodes also
    /// run after a run-level abort.
    AllDone,
}

impl fmt::Display for TriggerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerRule::AllSuccess => "all-success",
            TriggerRule::AnySuccess => "any-success",
            TriggerRule::AllDone => "all-done",
        };
        f.write_str(s)
    }
}

/// What a failed node does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Dependents are skipped through the normal trigger rules.
    #[default]
    Propagate,
    /// Stop processing new nodes; only `AllDone` nodes still run.
    AbortRun,
}

/// One labeled fan-out of a branch node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOutcome {
    pub label: BranchLabel,
    pub targets: Vec<TaskName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Action,
    Branch,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Action => f.write_str("action"),
            NodeKind::Branch => f.write_str("branch"),
        }
    }
}

/// Static definition of a node, assembled with the fluent methods below and
/// handed to [`GraphBuilder`](super::GraphBuilder).
#[derive(Debug, Clone)]
pub struct TaskNode {
    name: TaskName,
    deps: Vec<TaskName>,
    kind: NodeKind,
    outcomes: Vec<BranchOutcome>,
    trigger_rule: TriggerRule,
    on_failure: FailurePolicy,
    reads: Vec<ContextKey>,
    optional_reads: Vec<ContextKey>,
    writes: Vec<ContextKey>,
}

impl TaskNode {
    pub fn action(name: impl Into<TaskName>) -> Self {
        Self::with_kind(name.into(), NodeKind::Action)
    }

    pub fn branch(name: impl Into<TaskName>) -> Self {
        Self::with_kind(name.into(), NodeKind::Branch)
    }

    fn with_kind(name: TaskName, kind: NodeKind) -> Self {
        Self {
            name,
            deps: Vec::new(),
            kind,
            outcomes: Vec::new(),
            trigger_rule: TriggerRule::default(),
            on_failure: FailurePolicy::default(),
            reads: Vec::new(),
            optional_reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn trigger_rule(mut self, rule: TriggerRule) -> Self {
        self.trigger_rule = rule;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn reads(mut self, key: ContextKey) -> Self {
        self.reads.push(key);
        self
    }

    /// Declare a read of a key whose producer may not have run, as seen by
    /// `all-done` finalizers. The producer must still be upstream.
    pub fn reads_if_present(mut self, key: ContextKey) -> Self {
        self.optional_reads.push(key);
        self
    }

    pub fn writes(mut self, key: ContextKey) -> Self {
        self.writes.push(key);
        self
    }

    /// Declare a labeled outcome. Only meaningful on branch nodes; the graph
    /// builder rejects action nodes that declare outcomes.
    pub fn outcome<I, S>(mut self, label: BranchLabel, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let targets = targets.into_iter().map(Into::into).collect();
        self.outcomes.push(BranchOutcome { label, targets });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[TaskName] {
        &self.deps
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_branch(&self) -> bool {
        self.kind == NodeKind::Branch
    }

    pub fn outcomes(&self) -> &[BranchOutcome] {
        &self.outcomes
    }

    pub fn labels(&self) -> impl Iterator<Item = BranchLabel> + '_ {
        self.outcomes.iter().map(|o| o.label)
    }

    pub fn targets_of(&self, label: BranchLabel) -> Option<&[TaskName]> {
        self.outcomes
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.targets.as_slice())
    }

    pub fn trigger(&self) -> TriggerRule {
        self.trigger_rule
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure
    }

    pub fn read_keys(&self) -> &[ContextKey] {
        &self.reads
    }

    pub fn optional_read_keys(&self) -> &[ContextKey] {
        &self.optional_reads
    }

    /// Whether the node declared `key` as a read of either kind.
    pub fn may_read(&self, key: ContextKey) -> bool {
        self.reads.contains(&key) || self.optional_reads.contains(&key)
    }

    pub fn write_keys(&self) -> &[ContextKey] {
        &self.writes
    }
}

/// Per-run status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Skipped
        )
    }

    /// Status transitions are monotonic: a node never re-enters `Pending`
    /// and never leaves a terminal status.
    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Pending, NodeStatus::Skipped)
                | (NodeStatus::Running, NodeStatus::Succeeded)
                | (NodeStatus::Running, NodeStatus::Failed)
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Succeeded => "succeeded",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
