// src/exec/mod.rs

//! Node execution layer.
//!
//! - [`backend`] provides the `TaskHandler` trait the graph executor invokes
//!   for every node attempt.
//! - [`retry`] wraps an attempt in the fixed-delay retry policy.
//! - [`remote`] talks to the model-serving API and classifies its responses.

pub mod backend;
pub mod remote;
pub mod retry;

pub use backend::{NodeInvocation, NodeOutput, TaskFuture, TaskHandler};
pub use remote::{
    AccuracyPayload, HttpRemoteClient, RemoteCallResult, RemoteClient, RemoteFuture, RemoteOperation,
    TokenPayload, classify_status,
};
pub use retry::{Attempted, RetryPolicy};
