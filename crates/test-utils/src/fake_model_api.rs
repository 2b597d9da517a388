use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use retraindag::errors::TaskError;
use retraindag::exec::{RemoteCallResult, RemoteClient, RemoteFuture, RemoteOperation};

pub const FAKE_TOKEN: &str = "fake-token";

#[derive(Debug, Clone)]
enum Failure {
    Always(TaskError),
    Times(u32, TaskError),
}

#[derive(Debug)]
struct State {
    /// Accuracy readings handed out in order; the last one repeats.
    accuracies: VecDeque<f64>,
    failures: HashMap<RemoteOperation, Failure>,
    calls: Vec<RemoteOperation>,
    version: u32,
    current_model: String,
    archived_model: Option<String>,
}

/// In-memory stand-in for the model-serving API.
///
/// Clones share state, so a test can keep a handle while the executor owns
/// another one.
#[derive(Debug, Clone)]
pub struct FakeModelApi {
    state: Arc<Mutex<State>>,
}

impl FakeModelApi {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                accuracies: VecDeque::from([0.9]),
                failures: HashMap::new(),
                calls: Vec::new(),
                version: 1,
                current_model: "model-v1".to_string(),
                archived_model: None,
            })),
        }
    }

    /// Readings returned by successive accuracy checks.
    pub fn with_accuracies(self, readings: &[f64]) -> Self {
        self.state.lock().unwrap().accuracies = readings.iter().copied().collect();
        self
    }

    /// Make every call of `op` fail with `err`.
    pub fn fail_always(self, op: RemoteOperation, err: TaskError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, Failure::Always(err));
        self
    }

    /// Make the first `times` calls of `op` fail with `err`.
    pub fn fail_times(self, op: RemoteOperation, times: u32, err: TaskError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, Failure::Times(times, err));
        self
    }

    pub fn calls(&self) -> Vec<RemoteOperation> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: RemoteOperation) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == op)
            .count()
    }

    pub fn current_model(&self) -> String {
        self.state.lock().unwrap().current_model.clone()
    }

    pub fn archived_model(&self) -> Option<String> {
        self.state.lock().unwrap().archived_model.clone()
    }

    fn respond(&self, op: RemoteOperation, token: Option<&str>) -> Result<RemoteCallResult, TaskError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);

        match state.failures.get_mut(&op) {
            Some(Failure::Always(err)) => return Err(err.clone()),
            Some(Failure::Times(left, err)) if *left > 0 => {
                *left -= 1;
                return Err(err.clone());
            }
            _ => {}
        }

        if op != RemoteOperation::IssueToken && token != Some(FAKE_TOKEN) {
            return Err(TaskError::Unauthorized { status: 401 });
        }

        let payload = match op {
            RemoteOperation::IssueToken => Some(json!({ "access_token": FAKE_TOKEN, "token_type": "bearer" })),
            RemoteOperation::ReloadData => None,
            RemoteOperation::CheckAccuracy => {
                let reading = if state.accuracies.len() > 1 {
                    state.accuracies.pop_front()
                } else {
                    state.accuracies.front().copied()
                };
                Some(json!({ "accuracy": reading.unwrap_or(0.0) }))
            }
            RemoteOperation::BackupModel => {
                state.archived_model = Some(state.current_model.clone());
                None
            }
            RemoteOperation::RetrainModel => {
                state.version += 1;
                state.current_model = format!("model-v{}", state.version);
                None
            }
            RemoteOperation::RestoreModel => {
                if let Some(archived) = state.archived_model.clone() {
                    state.current_model = archived;
                }
                None
            }
        };

        Ok(RemoteCallResult {
            status: 200,
            payload,
            elapsed: Duration::from_millis(1),
        })
    }
}

impl Default for FakeModelApi {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteClient for FakeModelApi {
    fn call<'a>(&'a self, op: RemoteOperation, token: Option<&'a str>) -> RemoteFuture<'a> {
        let result = self.respond(op, token);
        Box::pin(async move { result })
    }
}
