// src/maintenance/outcome.rs

//! Classification of a finished maintenance run.

use std::fmt;

use crate::dag::{NodeStatus, TaskName};
use crate::errors::TaskError;
use crate::maintenance::nodes;
use crate::workflow::{RunRecords, WorkflowRun};

/// What a maintenance run ended up doing, as reported to humans.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceOutcome {
    /// Accuracy was at or above the threshold; nothing was touched.
    ModelHealthy,
    /// The model was retrained and the new version kept.
    Retrained,
    /// The retrained model under-performed and the backup was restored.
    RolledBack,
    /// No token could be obtained.
    AuthFailure { error: TaskError },
    /// A remote operation other than token issuance or restore failed.
    RemoteOperationFailure { node: TaskName, error: TaskError },
    /// Restoring the backup failed; the retrained model may still be serving.
    RollbackFailure { error: TaskError },
}

impl MaintenanceOutcome {
    /// Classify `run`. Every node upstream of `notify` must be terminal.
    pub fn from_run(run: &WorkflowRun) -> Self {
        if let Some(message) = run.panic_message() {
            return MaintenanceOutcome::RemoteOperationFailure {
                node: "run".to_string(),
                error: TaskError::Panicked(message.to_string()),
            };
        }
        Self::from_records(run.node_records())
    }

    /// Classify from per-node records alone, as seen by the `notify` node.
    pub fn from_records(run: RunRecords<'_>) -> Self {
        let failed = |node: &str| run.status_of(node) == Some(NodeStatus::Failed);
        let succeeded = |node: &str| run.status_of(node) == Some(NodeStatus::Succeeded);
        let last_error = |node: &str| {
            run.record(node)
                .and_then(|r| r.last_error.clone())
                .unwrap_or_else(|| TaskError::UnknownNode(node.to_string()))
        };

        if failed(nodes::GET_TOKEN) {
            return MaintenanceOutcome::AuthFailure {
                error: last_error(nodes::GET_TOKEN),
            };
        }

        if failed(nodes::ROLLBACK) {
            return MaintenanceOutcome::RollbackFailure {
                error: last_error(nodes::ROLLBACK),
            };
        }

        if let Some(failure) = run
            .failures()
            .into_iter()
            .find(|f| f.node != nodes::NOTIFY)
        {
            return MaintenanceOutcome::RemoteOperationFailure {
                node: failure.node,
                error: failure.error,
            };
        }

        if succeeded(nodes::COMMIT) {
            MaintenanceOutcome::Retrained
        } else if succeeded(nodes::ROLLBACK) {
            MaintenanceOutcome::RolledBack
        } else if succeeded(nodes::NOOP) {
            MaintenanceOutcome::ModelHealthy
        } else {
            MaintenanceOutcome::RemoteOperationFailure {
                node: nodes::NOTIFY.to_string(),
                error: TaskError::InvalidOutcome(
                    "run reached notify without completing a terminal path".to_string(),
                ),
            }
        }
    }

    /// Healthy and retrained runs use the success template.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MaintenanceOutcome::ModelHealthy | MaintenanceOutcome::Retrained
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceOutcome::ModelHealthy => "model_healthy",
            MaintenanceOutcome::Retrained => "retrained",
            MaintenanceOutcome::RolledBack => "rolled_back",
            MaintenanceOutcome::AuthFailure { .. } => "auth_failure",
            MaintenanceOutcome::RemoteOperationFailure { .. } => "remote_operation_failure",
            MaintenanceOutcome::RollbackFailure { .. } => "rollback_failure",
        }
    }
}

impl fmt::Display for MaintenanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceOutcome::ModelHealthy => f.write_str("model accuracy is above the threshold"),
            MaintenanceOutcome::Retrained => f.write_str("model retrained and kept"),
            MaintenanceOutcome::RolledBack => {
                f.write_str("retrained model rejected; previous model restored")
            }
            MaintenanceOutcome::AuthFailure { error } => {
                write!(f, "could not authenticate against the model API: {error}")
            }
            MaintenanceOutcome::RemoteOperationFailure { node, error } => {
                write!(f, "node '{node}' failed: {error}")
            }
            MaintenanceOutcome::RollbackFailure { error } => {
                write!(f, "restoring the previous model failed: {error}")
            }
        }
    }
}
