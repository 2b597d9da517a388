// src/maintenance/mod.rs

//! The model-maintenance workflow.
//!
//! [`maintenance_graph`] defines the static graph, [`MaintenanceTasks`] maps
//! each node onto remote calls and gate decisions, and
//! [`MaintenanceOutcome`] classifies a run for the notification.

pub mod gate;
pub mod outcome;
pub mod tasks;

pub use gate::AccuracyGate;
pub use outcome::MaintenanceOutcome;
pub use tasks::{MaintenanceStep, MaintenanceTasks};

use crate::dag::{BranchLabel, FailurePolicy, TaskGraph, TaskNode, TriggerRule};
use crate::errors::Result;
use crate::workflow::ContextKey;

/// Node names of the maintenance graph.
pub mod nodes {
    pub const GET_TOKEN: &str = "get_token";
    pub const RELOAD_DATA: &str = "reload_data";
    pub const CHECK_ACCURACY: &str = "check_accuracy";
    pub const BACKUP: &str = "backup";
    pub const NOOP: &str = "noop";
    pub const RETRAIN: &str = "retrain";
    pub const VALIDATE: &str = "validate";
    pub const COMMIT: &str = "commit";
    pub const ROLLBACK: &str = "rollback";
    pub const NOTIFY: &str = "notify";
}

/// Build the maintenance graph.
///
/// ```text
/// get_token -> reload_data -> check_accuracy -+-[noop]---> noop --------------------------+
///                                             |                                           |
///                                             +-[backup]-> backup -> retrain -> validate -+-[commit]---> commit ---> notify
///                                                                                         +-[rollback]-> rollback -+
/// ```
pub fn maintenance_graph() -> Result<TaskGraph> {
    use nodes::*;

    TaskGraph::builder()
        .node(
            TaskNode::action(GET_TOKEN)
                .on_failure(FailurePolicy::AbortRun)
                .writes(ContextKey::Token),
        )
        .node(
            TaskNode::action(RELOAD_DATA)
                .after(GET_TOKEN)
                .reads(ContextKey::Token),
        )
        .node(
            TaskNode::branch(CHECK_ACCURACY)
                .after(RELOAD_DATA)
                .reads(ContextKey::Token)
                .writes(ContextKey::PreAccuracy)
                .outcome(BranchLabel::Backup, [BACKUP])
                .outcome(BranchLabel::Noop, [NOOP]),
        )
        .node(
            TaskNode::action(BACKUP)
                .after(CHECK_ACCURACY)
                .reads(ContextKey::Token),
        )
        .node(TaskNode::action(NOOP).after(CHECK_ACCURACY))
        .node(
            TaskNode::action(RETRAIN)
                .after(BACKUP)
                .reads(ContextKey::Token),
        )
        .node(
            TaskNode::branch(VALIDATE)
                .after(RETRAIN)
                .reads(ContextKey::Token)
                .reads(ContextKey::PreAccuracy)
                .writes(ContextKey::PostAccuracy)
                .outcome(BranchLabel::Commit, [COMMIT])
                .outcome(BranchLabel::Rollback, [ROLLBACK]),
        )
        .node(TaskNode::action(COMMIT).after(VALIDATE))
        .node(
            TaskNode::action(ROLLBACK)
                .after(VALIDATE)
                .reads(ContextKey::Token)
                .on_failure(FailurePolicy::AbortRun),
        )
        .node(
            TaskNode::action(NOTIFY)
                .after(NOOP)
                .after(COMMIT)
                .after(ROLLBACK)
                .trigger_rule(TriggerRule::AllDone)
                .reads_if_present(ContextKey::PreAccuracy)
                .reads_if_present(ContextKey::PostAccuracy),
        )
        .build()
}
