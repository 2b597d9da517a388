// src/dag/mod.rs

//! Task graph representation and execution.
//!
//! - [`graph`] holds the immutable, validated graph of tasks.
//! - [`task_info`] provides node definitions, labels and trigger rules.
//! - [`state_manager`] manages per-run status transitions and evaluates
//!   trigger rules.
//! - [`executor`] drives one run through the graph.

pub mod executor;
pub mod graph;
pub mod state_manager;
pub mod task_info;

pub use executor::GraphExecutor;
pub use graph::{GraphBuilder, TaskGraph};
pub use state_manager::{Readiness, SkipReason};
pub use task_info::{
    BranchLabel, BranchOutcome, FailurePolicy, NodeKind, NodeStatus, TaskName, TaskNode,
    TriggerRule,
};
