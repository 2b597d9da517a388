// src/errors.rs

//! Crate-wide error types.
//!
//! - [`RetraindagError`] covers startup and orchestration failures (config,
//!   graph validation, IO).
//! - [`TaskError`] is the error a single node invocation can end with. It is
//!   what the retry policy classifies and what a failed node records.
//! - [`NotifyError`] is returned by notifier channels and is never fatal.

use std::time::Duration;

use thiserror::Error;

use crate::workflow::ContextKey;

#[derive(Error, Debug)]
pub enum RetraindagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid task graph: {0}")]
    GraphError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RetraindagError>;

/// Why a single node invocation failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication rejected by remote API (status {status})")]
    Unauthorized { status: u16 },

    #[error("evaluation data unavailable: {0}")]
    DataUnavailable(String),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("context key `{0}` has not been written by its producer")]
    MissingContext(ContextKey),

    #[error("context key `{0}` was already written in this run")]
    ContextAlreadyWritten(ContextKey),

    #[error("node wrote undeclared context key `{0}`")]
    UndeclaredWrite(ContextKey),

    #[error("node read undeclared context key `{0}`")]
    UndeclaredRead(ContextKey),

    #[error("invalid branch outcome: {0}")]
    InvalidOutcome(String),

    #[error("no handler for node `{0}`")]
    UnknownNode(String),

    #[error("run task stopped before finishing: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Remote and transport failures are worth another attempt; everything
    /// else is a wiring bug that will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskError::Transport(_)
                | TaskError::Timeout(_)
                | TaskError::Unauthorized { .. }
                | TaskError::DataUnavailable(_)
                | TaskError::UnexpectedStatus { .. }
                | TaskError::MalformedPayload(_)
        )
    }

    /// Short, stable label used as the `error_kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Transport(_) => "transport",
            TaskError::Timeout(_) => "timeout",
            TaskError::Unauthorized { .. } => "unauthorized",
            TaskError::DataUnavailable(_) => "data_unavailable",
            TaskError::UnexpectedStatus { .. } => "unexpected_status",
            TaskError::MalformedPayload(_) => "malformed_payload",
            TaskError::MissingContext(_) => "missing_context",
            TaskError::ContextAlreadyWritten(_) => "context_already_written",
            TaskError::UndeclaredWrite(_) => "undeclared_write",
            TaskError::UndeclaredRead(_) => "undeclared_read",
            TaskError::InvalidOutcome(_) => "invalid_outcome",
            TaskError::UnknownNode(_) => "unknown_node",
            TaskError::Panicked(_) => "panicked",
        }
    }
}

/// Failure to deliver a notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),

    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
}
