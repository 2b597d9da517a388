// src/workflow/mod.rs

//! Per-run state: the [`WorkflowRun`] record and its [`RunContext`].

pub mod context;
pub mod run;

pub use context::{ContextKey, ContextValue, RunContext};
pub use run::{NodeRecord, RunFailure, RunRecords, RunStatus, WorkflowRun};
