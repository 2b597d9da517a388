// src/maintenance/tasks.rs

//! What each maintenance node does when the executor invokes it.

use std::str::FromStr;

use tracing::{error, info, warn};

use crate::errors::TaskError;
use crate::exec::{
    AccuracyPayload, NodeInvocation, NodeOutput, RemoteClient, RemoteOperation, TaskFuture,
    TaskHandler, TokenPayload,
};
use crate::maintenance::gate::AccuracyGate;
use crate::maintenance::nodes;
use crate::maintenance::outcome::MaintenanceOutcome;
use crate::notify::{Notification, Notifier};
use crate::workflow::{ContextKey, ContextValue};

/// One node of the maintenance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStep {
    GetToken,
    ReloadData,
    CheckAccuracy,
    Backup,
    Noop,
    Retrain,
    Validate,
    Commit,
    Rollback,
    Notify,
}

impl FromStr for MaintenanceStep {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let step = match s {
            nodes::GET_TOKEN => MaintenanceStep::GetToken,
            nodes::RELOAD_DATA => MaintenanceStep::ReloadData,
            nodes::CHECK_ACCURACY => MaintenanceStep::CheckAccuracy,
            nodes::BACKUP => MaintenanceStep::Backup,
            nodes::NOOP => MaintenanceStep::Noop,
            nodes::RETRAIN => MaintenanceStep::Retrain,
            nodes::VALIDATE => MaintenanceStep::Validate,
            nodes::COMMIT => MaintenanceStep::Commit,
            nodes::ROLLBACK => MaintenanceStep::Rollback,
            nodes::NOTIFY => MaintenanceStep::Notify,
            other => return Err(TaskError::UnknownNode(other.to_string())),
        };
        Ok(step)
    }
}

/// [`TaskHandler`] for the maintenance graph.
pub struct MaintenanceTasks<C, N> {
    client: C,
    notifier: N,
    gate: AccuracyGate,
    recipients: Vec<String>,
}

impl<C: RemoteClient, N: Notifier> MaintenanceTasks<C, N> {
    pub fn new(client: C, notifier: N, gate: AccuracyGate, recipients: Vec<String>) -> Self {
        Self {
            client,
            notifier,
            gate,
            recipients,
        }
    }

    async fn run_step(&self, invocation: NodeInvocation<'_>) -> Result<NodeOutput, TaskError> {
        let step: MaintenanceStep = invocation.node.name().parse()?;
        let run_id = invocation.run_id();

        match step {
            MaintenanceStep::GetToken => {
                let result = self.client.call(RemoteOperation::IssueToken, None).await?;
                let payload: TokenPayload = result.decode()?;
                if payload.access_token.is_empty() {
                    return Err(TaskError::MalformedPayload(
                        "token response carried an empty access_token".to_string(),
                    ));
                }
                info!(run_id = %run_id, elapsed = ?result.elapsed, "obtained API token");
                Ok(NodeOutput::done().write(ContextKey::Token, ContextValue::Token(payload.access_token)))
            }
            MaintenanceStep::ReloadData => {
                self.client
                    .call(RemoteOperation::ReloadData, Some(invocation.token()?))
                    .await?;
                info!(run_id = %run_id, "raw data imported and dataset rebuilt");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::CheckAccuracy => {
                let accuracy = self.fetch_accuracy(invocation.token()?).await?;
                let label = self.gate.pre_retrain(accuracy);
                info!(
                    run_id = %run_id,
                    accuracy,
                    threshold = self.gate.threshold(),
                    decision = %label,
                    "checked accuracy of the deployed model"
                );
                Ok(NodeOutput::done()
                    .write(ContextKey::PreAccuracy, ContextValue::Accuracy(accuracy))
                    .select(label))
            }
            MaintenanceStep::Backup => {
                self.client
                    .call(RemoteOperation::BackupModel, Some(invocation.token()?))
                    .await?;
                info!(run_id = %run_id, "current model archived as backup");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::Noop => {
                info!(run_id = %run_id, "model accuracy is acceptable; nothing to do");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::Retrain => {
                self.client
                    .call(RemoteOperation::RetrainModel, Some(invocation.token()?))
                    .await?;
                info!(run_id = %run_id, "model retrained and deployed");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::Validate => {
                let previous = invocation.require_accuracy(ContextKey::PreAccuracy)?;
                let accuracy = self.fetch_accuracy(invocation.token()?).await?;
                let label = self.gate.post_retrain(accuracy);
                info!(
                    run_id = %run_id,
                    accuracy,
                    previous,
                    threshold = self.gate.threshold(),
                    decision = %label,
                    "validated retrained model"
                );
                Ok(NodeOutput::done()
                    .write(ContextKey::PostAccuracy, ContextValue::Accuracy(accuracy))
                    .select(label))
            }
            MaintenanceStep::Commit => {
                info!(run_id = %run_id, "keeping retrained model");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::Rollback => {
                warn!(run_id = %run_id, "retrained model rejected; restoring backup");
                self.client
                    .call(RemoteOperation::RestoreModel, Some(invocation.token()?))
                    .await?;
                info!(run_id = %run_id, "previous model restored");
                Ok(NodeOutput::done())
            }
            MaintenanceStep::Notify => {
                self.notify(&invocation).await?;
                Ok(NodeOutput::done())
            }
        }
    }

    async fn fetch_accuracy(&self, token: &str) -> Result<f64, TaskError> {
        let result = self
            .client
            .call(RemoteOperation::CheckAccuracy, Some(token))
            .await?;
        let payload: AccuracyPayload = result.decode()?;

        if !payload.accuracy.is_finite() || !(0.0..=1.0).contains(&payload.accuracy) {
            return Err(TaskError::MalformedPayload(format!(
                "accuracy {} is not a fraction between 0 and 1",
                payload.accuracy
            )));
        }
        Ok(payload.accuracy)
    }

    /// Classify the run and send one notification. Delivery errors are
    /// logged and swallowed.
    async fn notify(&self, invocation: &NodeInvocation<'_>) -> Result<(), TaskError> {
        let run_id = invocation.run_id();
        let outcome = MaintenanceOutcome::from_records(invocation.records());

        if let MaintenanceOutcome::RollbackFailure { error } = &outcome {
            error!(
                run_id = %run_id,
                outcome = outcome.as_str(),
                error = %error,
                "rollback failed; the rejected model may still be serving predictions"
            );
        }

        let notification = Notification::compose(
            run_id,
            &outcome,
            self.gate.threshold(),
            invocation.accuracy(ContextKey::PreAccuracy)?,
            invocation.accuracy(ContextKey::PostAccuracy)?,
            &self.recipients,
        );

        match self.notifier.send(&notification).await {
            Ok(()) => info!(
                run_id = %run_id,
                outcome = outcome.as_str(),
                "notification sent"
            ),
            Err(e) => warn!(
                run_id = %run_id,
                outcome = outcome.as_str(),
                error = %e,
                "failed to deliver notification"
            ),
        }
        Ok(())
    }
}

impl<C: RemoteClient, N: Notifier> TaskHandler for MaintenanceTasks<C, N> {
    fn invoke<'a>(&'a self, invocation: NodeInvocation<'a>) -> TaskFuture<'a> {
        Box::pin(self.run_step(invocation))
    }
}
