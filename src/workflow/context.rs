// src/workflow/context.rs

//! Per-run key/value store shared between nodes.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::TaskError;

/// The fixed set of values nodes can hand to each other within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextKey {
    /// Bearer token issued by the remote API.
    Token,
    /// Accuracy of the deployed model on freshly reloaded data.
    PreAccuracy,
    /// Accuracy of the retrained model.
    PostAccuracy,
}

impl ContextKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKey::Token => "token",
            ContextKey::PreAccuracy => "pre_accuracy",
            ContextKey::PostAccuracy => "post_accuracy",
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq)]
pub enum ContextValue {
    Token(String),
    Accuracy(f64),
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Token(_) => f.write_str("Token(<redacted>)"),
            ContextValue::Accuracy(a) => f.debug_tuple("Accuracy").field(a).finish(),
        }
    }
}

/// Write-once store owned by a single [`WorkflowRun`](super::WorkflowRun).
///
/// Only the executor writes into it, after a node invocation succeeded, so a
/// retried attempt never leaves a half-written value behind.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    values: BTreeMap<ContextKey, ContextValue>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ContextKey, value: ContextValue) -> Result<(), TaskError> {
        if self.values.contains_key(&key) {
            return Err(TaskError::ContextAlreadyWritten(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: ContextKey) -> Option<&ContextValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Bearer token, failing if `get_token` has not written it.
    pub fn token(&self) -> Result<&str, TaskError> {
        match self.values.get(&ContextKey::Token) {
            Some(ContextValue::Token(t)) => Ok(t.as_str()),
            _ => Err(TaskError::MissingContext(ContextKey::Token)),
        }
    }

    /// Accuracy reading stored under `key`, if present.
    pub fn accuracy(&self, key: ContextKey) -> Option<f64> {
        match self.values.get(&key) {
            Some(ContextValue::Accuracy(a)) => Some(*a),
            _ => None,
        }
    }

    /// Accuracy reading stored under `key`, failing if absent.
    pub fn require_accuracy(&self, key: ContextKey) -> Result<f64, TaskError> {
        self.accuracy(key).ok_or(TaskError::MissingContext(key))
    }

    /// Drop secrets before the run is archived.
    pub fn scrub_secrets(&mut self) {
        self.values.remove(&ContextKey::Token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_write_once() {
        let mut ctx = RunContext::new();
        ctx.insert(ContextKey::PreAccuracy, ContextValue::Accuracy(0.7))
            .unwrap();

        let err = ctx
            .insert(ContextKey::PreAccuracy, ContextValue::Accuracy(0.9))
            .unwrap_err();
        assert_eq!(err, TaskError::ContextAlreadyWritten(ContextKey::PreAccuracy));
        assert_eq!(ctx.accuracy(ContextKey::PreAccuracy), Some(0.7));
    }

    #[test]
    fn token_is_redacted_and_scrubbed() {
        let mut ctx = RunContext::new();
        assert_eq!(
            ctx.token(),
            Err(TaskError::MissingContext(ContextKey::Token))
        );

        ctx.insert(ContextKey::Token, ContextValue::Token("abc123".into()))
            .unwrap();
        assert_eq!(ctx.token(), Ok("abc123"));
        assert!(!format!("{ctx:?}").contains("abc123"));

        ctx.scrub_secrets();
        assert!(!ctx.contains(ContextKey::Token));
    }
}
