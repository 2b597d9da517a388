// src/notify/message.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::maintenance::MaintenanceOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// One outcome message, rendered from the success or failure template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub run_id: Uuid,
    /// Stable outcome label such as `rolled_back`.
    pub outcome: &'static str,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
    pub threshold: f64,
    pub pre_accuracy: Option<f64>,
    pub post_accuracy: Option<f64>,
    pub recipients: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn compose(
        run_id: Uuid,
        outcome: &MaintenanceOutcome,
        threshold: f64,
        pre_accuracy: Option<f64>,
        post_accuracy: Option<f64>,
        recipients: &[String],
    ) -> Self {
        let kind = if outcome.is_success() {
            NotificationKind::Success
        } else {
            NotificationKind::Failure
        };

        let subject = subject_for(outcome).to_string();

        let mut body = String::new();
        body.push_str(match kind {
            NotificationKind::Success => "Model maintenance succeeded.\n\n",
            NotificationKind::Failure => {
                "Model maintenance did not complete as expected. Please check the logs.\n\n"
            }
        });
        body.push_str(&format!("Outcome: {outcome}\n"));
        body.push_str(&format!("Accuracy threshold: {}\n", percent(Some(threshold))));
        body.push_str(&format!(
            "Accuracy of the model in production: {}\n",
            percent(pre_accuracy)
        ));
        if post_accuracy.is_some() {
            body.push_str(&format!(
                "Accuracy of the retrained model: {}\n",
                percent(post_accuracy)
            ));
        }
        body.push_str(&format!("Run: {run_id}\n"));

        Self {
            run_id,
            outcome: outcome.as_str(),
            kind,
            subject,
            body,
            threshold,
            pre_accuracy,
            post_accuracy,
            recipients: recipients.to_vec(),
            created_at: Utc::now(),
        }
    }
}

fn subject_for(outcome: &MaintenanceOutcome) -> &'static str {
    match outcome {
        MaintenanceOutcome::ModelHealthy => "Model accuracy above threshold",
        MaintenanceOutcome::Retrained => "Model retrained with success",
        MaintenanceOutcome::RolledBack => "Model retraining failed: previous model restored",
        MaintenanceOutcome::AuthFailure { .. } => "Model maintenance failed: authentication",
        MaintenanceOutcome::RemoteOperationFailure { .. } => "Model maintenance failed",
        MaintenanceOutcome::RollbackFailure { .. } => "Model rollback failed",
    }
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_are_rendered_as_percentages() {
        let n = Notification::compose(
            Uuid::nil(),
            &MaintenanceOutcome::RolledBack,
            0.85,
            Some(0.70),
            Some(0.6),
            &["ops@example.com".to_string()],
        );

        assert_eq!(n.kind, NotificationKind::Failure);
        assert_eq!(n.outcome, "rolled_back");
        assert!(n.body.contains("Accuracy threshold: 85.0%"));
        assert!(n.body.contains("production: 70.0%"));
        assert!(n.body.contains("retrained model: 60.0%"));
        assert_eq!(n.recipients, vec!["ops@example.com".to_string()]);
    }

    #[test]
    fn healthy_model_uses_success_template_without_post_reading() {
        let n = Notification::compose(
            Uuid::nil(),
            &MaintenanceOutcome::ModelHealthy,
            0.85,
            Some(0.9),
            None,
            &[],
        );

        assert_eq!(n.kind, NotificationKind::Success);
        assert!(!n.body.contains("retrained model"));
    }
}
