#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use retraindag::config::model::{
    Endpoints, RawApiSection, RawGateSection, RawNotifySection, RawRetrySection,
    RawScheduleSection,
};
use retraindag::config::{ConfigFile, RawConfigFile};
use retraindag::dag::{GraphExecutor, TaskGraph};
use retraindag::exec::{RemoteClient, RetryPolicy};
use retraindag::maintenance::{AccuracyGate, MaintenanceTasks, maintenance_graph};
use retraindag::notify::Notifier;
use retraindag::types::{NotifyChannel, OverlapBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a minimal valid config pointing at `http://127.0.0.1:8000`
/// with an inline password.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                api: RawApiSection {
                    base_url: "http://127.0.0.1:8000".to_string(),
                    username: "admin".to_string(),
                    password: Some("secret".to_string()),
                    password_env: None,
                    request_timeout: "30s".to_string(),
                    endpoints: Endpoints::default(),
                },
                gate: RawGateSection::default(),
                retry: RawRetrySection::default(),
                schedule: RawScheduleSection::default(),
                notify: RawNotifySection::default(),
            },
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.api.base_url = url.to_string();
        self
    }

    pub fn password_env(mut self, var: &str) -> Self {
        self.config.api.password = None;
        self.config.api.password_env = Some(var.to_string());
        self
    }

    pub fn request_timeout(mut self, timeout: &str) -> Self {
        self.config.api.request_timeout = timeout.to_string();
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.gate.accuracy_threshold = threshold;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: &str) -> Self {
        self.config.retry.delay = delay.to_string();
        self
    }

    pub fn interval(mut self, interval: &str) -> Self {
        self.config.schedule.interval = interval.to_string();
        self
    }

    pub fn overlap(mut self, overlap: OverlapBehaviour, queue_length: usize) -> Self {
        self.config.schedule.overlap = overlap;
        self.config.schedule.queue_length = queue_length;
        self
    }

    pub fn webhook(mut self, url: &str) -> Self {
        self.config.notify.channel = NotifyChannel::Webhook;
        self.config.notify.webhook_url = Some(url.to_string());
        self
    }

    pub fn recipient(mut self, recipient: &str) -> Self {
        self.config.notify.recipients.push(recipient.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Maintenance graph executor wired to the given fakes, with no delay
/// between attempts.
pub fn maintenance_executor<C, N>(
    client: C,
    notifier: N,
    threshold: f64,
    max_attempts: u32,
) -> GraphExecutor<MaintenanceTasks<C, N>>
where
    C: RemoteClient,
    N: Notifier,
{
    let graph: Arc<TaskGraph> =
        Arc::new(maintenance_graph().expect("maintenance graph must be valid"));
    let tasks = MaintenanceTasks::new(
        client,
        notifier,
        AccuracyGate::new(threshold),
        vec!["ops@example.com".to_string()],
    );
    GraphExecutor::new(graph, tasks, RetryPolicy::new(max_attempts, Duration::ZERO))
}
