// src/exec/remote.rs

//! Client for the model-serving API.
//!
//! The workflow only needs a handful of named operations from the remote
//! side. [`RemoteClient`] exposes them as one `call` so tests can swap in a
//! scripted fake; [`HttpRemoteClient`] is the production implementation on
//! top of `reqwest`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::errors::{Result, TaskError};
use crate::workflow::ContextKey;

/// Named operations exposed by the model-serving API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    IssueToken,
    ReloadData,
    CheckAccuracy,
    BackupModel,
    RetrainModel,
    RestoreModel,
}

impl RemoteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOperation::IssueToken => "issue-token",
            RemoteOperation::ReloadData => "reload-data",
            RemoteOperation::CheckAccuracy => "check-accuracy",
            RemoteOperation::BackupModel => "backup-model",
            RemoteOperation::RetrainModel => "retrain-model",
            RemoteOperation::RestoreModel => "restore-model",
        }
    }

    /// Whether a successful response must carry a JSON payload.
    pub fn expects_payload(&self) -> bool {
        matches!(
            self,
            RemoteOperation::IssueToken | RemoteOperation::CheckAccuracy
        )
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful response of a remote operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCallResult {
    pub status: u16,
    pub payload: Option<serde_json::Value>,
    pub elapsed: Duration,
}

impl RemoteCallResult {
    /// Decode the payload into a typed response.
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, TaskError> {
        let value = self
            .payload
            .clone()
            .ok_or_else(|| TaskError::MalformedPayload("response carried no payload".into()))?;
        serde_json::from_value(value).map_err(|e| TaskError::MalformedPayload(e.to_string()))
    }
}

/// `{ "access_token": "..." }` returned by token issuance.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    pub access_token: String,
}

/// `{ "accuracy": 0.87 }` returned by the accuracy check.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AccuracyPayload {
    pub accuracy: f64,
}

pub type RemoteFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<RemoteCallResult, TaskError>> + Send + 'a>>;

/// Trait abstracting how remote operations are invoked.
///
/// `token` is the bearer token for every operation except
/// [`RemoteOperation::IssueToken`], which authenticates with the configured
/// credentials instead.
pub trait RemoteClient: Send + Sync {
    fn call<'a>(&'a self, op: RemoteOperation, token: Option<&'a str>) -> RemoteFuture<'a>;
}

/// Map a response status onto the workflow's error classification.
///
/// Returns the decoded JSON payload for 2xx responses.
pub fn classify_status(
    op: RemoteOperation,
    status: u16,
    body: &str,
) -> std::result::Result<Option<serde_json::Value>, TaskError> {
    match status {
        200..=299 => {
            if body.trim().is_empty() {
                if op.expects_payload() {
                    return Err(TaskError::MalformedPayload(format!(
                        "{op} returned an empty body"
                    )));
                }
                return Ok(None);
            }
            match serde_json::from_str(body) {
                Ok(value) => Ok(Some(value)),
                Err(e) if op.expects_payload() => Err(TaskError::MalformedPayload(e.to_string())),
                Err(_) => Ok(None),
            }
        }
        400 if op == RemoteOperation::IssueToken => Err(TaskError::Unauthorized { status }),
        401 | 403 => Err(TaskError::Unauthorized { status }),
        404 if op == RemoteOperation::CheckAccuracy => {
            Err(TaskError::DataUnavailable(truncate(body)))
        }
        _ => Err(TaskError::UnexpectedStatus {
            status,
            body: truncate(body),
        }),
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 256;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// `reqwest`-based client for the model-serving API.
pub struct HttpRemoteClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    request_timeout: Duration,
    endpoints: crate::config::Endpoints,
}

impl fmt::Debug for HttpRemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HttpRemoteClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(api.request_timeout).build()?;

        Ok(Self {
            client,
            base_url: api.base_url.clone(),
            username: api.username.clone(),
            password: api.password.clone(),
            request_timeout: api.request_timeout,
            endpoints: api.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> std::result::Result<Url, TaskError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TaskError::Transport(format!("invalid endpoint '{path}': {e}")))
    }

    /// Send one request and classify its response.
    async fn send(
        &self,
        op: RemoteOperation,
        request: RequestBuilder,
    ) -> std::result::Result<(u16, Option<serde_json::Value>), TaskError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        debug!(operation = %op, status, "remote response received");
        let payload = classify_status(op, status, &body)?;
        Ok((status, payload))
    }

    fn transport_error(&self, err: reqwest::Error) -> TaskError {
        if err.is_timeout() {
            TaskError::Timeout(self.request_timeout)
        } else {
            TaskError::Transport(err.to_string())
        }
    }

    fn bearer<'a>(&self, token: Option<&'a str>) -> std::result::Result<&'a str, TaskError> {
        token.ok_or(TaskError::MissingContext(ContextKey::Token))
    }

    async fn perform(
        &self,
        op: RemoteOperation,
        token: Option<&str>,
    ) -> std::result::Result<RemoteCallResult, TaskError> {
        let started = Instant::now();
        let ep = &self.endpoints;

        let (status, payload) = match op {
            RemoteOperation::IssueToken => {
                let form = [
                    ("grant_type", "password"),
                    ("username", self.username.as_str()),
                    ("password", self.password.as_str()),
                ];
                let req = self.client.post(self.url(&ep.token)?).form(&form);
                self.send(op, req).await?
            }
            RemoteOperation::ReloadData => {
                let token = self.bearer(token)?;
                let raw = self.client.post(self.url(&ep.raw)?).bearer_auth(token);
                self.send(op, raw).await?;
                let dataset = self.client.post(self.url(&ep.dataset)?).bearer_auth(token);
                self.send(op, dataset).await?
            }
            RemoteOperation::CheckAccuracy => {
                let token = self.bearer(token)?;
                let req = self.client.get(self.url(&ep.accuracy)?).bearer_auth(token);
                self.send(op, req).await?
            }
            RemoteOperation::BackupModel => {
                let token = self.bearer(token)?;
                let req = self.client.post(self.url(&ep.backup)?).bearer_auth(token);
                self.send(op, req).await?
            }
            RemoteOperation::RetrainModel => {
                let token = self.bearer(token)?;
                let req = self.client.post(self.url(&ep.train)?).bearer_auth(token);
                self.send(op, req).await?
            }
            RemoteOperation::RestoreModel => {
                let token = self.bearer(token)?;
                let req = self.client.post(self.url(&ep.restore)?).bearer_auth(token);
                self.send(op, req).await?
            }
        };

        Ok(RemoteCallResult {
            status,
            payload,
            elapsed: started.elapsed(),
        })
    }
}

impl RemoteClient for HttpRemoteClient {
    fn call<'a>(&'a self, op: RemoteOperation, token: Option<&'a str>) -> RemoteFuture<'a> {
        Box::pin(self.perform(op, token))
    }
}
