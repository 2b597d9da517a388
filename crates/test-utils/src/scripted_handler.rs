use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use retraindag::dag::{BranchLabel, TaskNode};
use retraindag::errors::TaskError;
use retraindag::exec::{NodeInvocation, NodeOutput, TaskFuture, TaskHandler};
use retraindag::workflow::{ContextKey, ContextValue};

/// What a scripted node does on each attempt.
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeed, writing every declared key with a placeholder value.
    Succeed,
    /// Succeed and select `label` (branch nodes).
    Select(BranchLabel),
    /// Fail every attempt.
    FailAlways(TaskError),
    /// Fail the first `n` attempts, then succeed like `Succeed`.
    FailTimes(u32, TaskError),
    /// Return exactly this output.
    Output(NodeOutput),
    /// Read `key` through the invocation, then succeed like `Succeed`.
    Read(ContextKey),
    /// Panic inside the handler.
    Panic,
}

/// A generic handler driven by per-node scripts, recording every
/// `(node, attempt)` invocation.
///
/// Unscripted nodes behave like [`Script::Succeed`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedHandler {
    scripts: HashMap<String, Script>,
    invocations: Arc<Mutex<Vec<(String, u32)>>>,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, node: &str, script: Script) -> Self {
        self.scripts.insert(node.to_string(), script);
        self
    }

    pub fn invocations(&self) -> Vec<(String, u32)> {
        self.invocations.lock().unwrap().clone()
    }

    /// Node names in invocation order, one entry per attempt.
    pub fn invoked_nodes(&self) -> Vec<String> {
        self.invocations().into_iter().map(|(n, _)| n).collect()
    }

    pub fn attempts_of(&self, node: &str) -> usize {
        self.invocations().iter().filter(|(n, _)| n == node).count()
    }

    fn respond(&self, invocation: &NodeInvocation<'_>) -> Result<NodeOutput, TaskError> {
        let (node, attempt) = (invocation.node, invocation.attempt);
        self.invocations
            .lock()
            .unwrap()
            .push((node.name().to_string(), attempt));

        match self.scripts.get(node.name()).cloned().unwrap_or(Script::Succeed) {
            Script::Succeed => Ok(placeholder_writes(node)),
            Script::Select(label) => Ok(placeholder_writes(node).select(label)),
            Script::FailAlways(err) => Err(err),
            Script::FailTimes(n, err) if attempt <= n => Err(err),
            Script::FailTimes(..) => Ok(placeholder_writes(node)),
            Script::Output(output) => Ok(output),
            Script::Read(key) => {
                invocation.read(key)?;
                Ok(placeholder_writes(node))
            }
            Script::Panic => panic!("scripted panic in node '{}'", node.name()),
        }
    }
}

fn placeholder_writes(node: &TaskNode) -> NodeOutput {
    node.write_keys()
        .iter()
        .fold(NodeOutput::done(), |out, key| match key {
            ContextKey::Token => out.write(*key, ContextValue::Token("placeholder".to_string())),
            _ => out.write(*key, ContextValue::Accuracy(0.5)),
        })
}

impl TaskHandler for ScriptedHandler {
    fn invoke<'a>(&'a self, invocation: NodeInvocation<'a>) -> TaskFuture<'a> {
        let result = self.respond(&invocation);
        Box::pin(async move { result })
    }
}
