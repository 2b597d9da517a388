// src/engine/history.rs

use std::collections::VecDeque;

use crate::workflow::WorkflowRun;

/// Bounded in-memory archive of finished runs, oldest first.
#[derive(Debug, Clone)]
pub struct RunHistory {
    capacity: usize,
    runs: VecDeque<WorkflowRun>,
}

impl RunHistory {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            runs: VecDeque::with_capacity(capacity),
        }
    }

    /// Archive a terminal run, evicting the oldest one when full.
    pub fn push(&mut self, run: WorkflowRun) {
        debug_assert!(run.is_terminal(), "only terminal runs are archived");
        if self.runs.len() == self.capacity {
            self.runs.pop_front();
        }
        self.runs.push_back(run);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&WorkflowRun> {
        self.runs.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.runs.iter()
    }
}
