// src/config/model.rs

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::types::{NotifyChannel, OverlapBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [api]
/// base_url = "http://127.0.0.1:8000"
/// username = "admin"
/// password_env = "RETRAINDAG_API_PASSWORD"
///
/// [gate]
/// accuracy_threshold = 0.85
///
/// [retry]
/// max_attempts = 3
/// delay = "5m"
///
/// [schedule]
/// interval = "1d"
/// overlap = "reject"
///
/// [notify]
/// channel = "log"
/// recipients = ["ops@example.com"]
/// ```
///
/// Only `[api]` is required; every other section has defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    pub api: RawApiSection,

    #[serde(default)]
    pub gate: RawGateSection,

    #[serde(default)]
    pub retry: RawRetrySection,

    #[serde(default)]
    pub schedule: RawScheduleSection,

    #[serde(default)]
    pub notify: RawNotifySection,
}

/// `[api]` section.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawApiSection {
    pub base_url: String,
    pub username: String,

    /// Inline password. Mutually exclusive with `password_env`.
    #[serde(default)]
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    #[serde(default)]
    pub endpoints: Endpoints,
}

impl fmt::Debug for RawApiSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawApiSection")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .field("request_timeout", &self.request_timeout)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

/// `[api.endpoints]`: paths relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub token: String,
    pub raw: String,
    pub dataset: String,
    pub accuracy: String,
    pub backup: String,
    pub train: String,
    pub restore: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token: "/token".to_string(),
            raw: "/raw".to_string(),
            dataset: "/dataset".to_string(),
            accuracy: "/accuracy".to_string(),
            backup: "/backup".to_string(),
            train: "/train".to_string(),
            restore: "/reverse_backup".to_string(),
        }
    }
}

/// `[gate]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGateSection {
    /// Fraction in `[0, 1]`; `actual >= threshold` passes.
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold: f64,
}

fn default_accuracy_threshold() -> f64 {
    0.85
}

impl Default for RawGateSection {
    fn default() -> Self {
        Self {
            accuracy_threshold: default_accuracy_threshold(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRetrySection {
    /// Total attempts per node, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub delay: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> String {
    "5m".to_string()
}

impl Default for RawRetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
        }
    }
}

/// `[schedule]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScheduleSection {
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,

    #[serde(default)]
    pub overlap: OverlapBehaviour,

    /// Maximum number of pending triggers kept with `overlap = "queue"`.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Number of finished runs kept in memory.
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_run_on_startup() -> bool {
    true
}

fn default_queue_length() -> usize {
    1
}

fn default_history_length() -> usize {
    16
}

impl Default for RawScheduleSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            run_on_startup: default_run_on_startup(),
            overlap: OverlapBehaviour::default(),
            queue_length: default_queue_length(),
            history_length: default_history_length(),
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawNotifySection {
    #[serde(default)]
    pub channel: NotifyChannel,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Validated configuration.
///
/// Produced from [`RawConfigFile`] via `TryFrom`; every duration is parsed,
/// every URL checked and the API password resolved. Passed explicitly to
/// whatever needs it and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub api: ApiConfig,
    pub gate: GateConfig,
    pub retry: RetryConfig,
    pub schedule: ScheduleConfig,
    pub notify: NotifyConfig,
}

#[derive(Clone)]
pub struct ApiConfig {
    /// Always ends with `/` so endpoint paths join below it.
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub request_timeout: Duration,
    pub endpoints: Endpoints,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
    pub accuracy_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub run_on_startup: bool,
    pub overlap: OverlapBehaviour,
    pub queue_length: usize,
    pub history_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    pub channel: NotifyChannel,
    pub webhook_url: Option<Url>,
    pub recipients: Vec<String>,
}
