// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::engine::TriggerReason;
use crate::types::OverlapBehaviour;

/// Triggers that arrive while a workflow run is already executing.
///
/// Semantics:
/// - `Reject`: the trigger is dropped and logged; nothing is ever queued.
/// - `Queue`: the trigger is kept until the active run ends. At most
///   `max_len` triggers are kept; when the queue is full the oldest one is
///   dropped.
///
/// Queued triggers start one at a time, so at most one run is ever active.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: OverlapBehaviour,
    max_len: usize,
    pending: VecDeque<TriggerReason>,
}

impl TriggerQueue {
    /// `max_len` is clamped to at least 1.
    pub fn new(behaviour: OverlapBehaviour, max_len: usize) -> Self {
        Self {
            behaviour,
            max_len: max_len.max(1),
            pending: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Record a trigger that arrived while a run is active. Returns whether
    /// it was kept.
    pub fn record_trigger(&mut self, reason: TriggerReason) -> bool {
        match self.behaviour {
            OverlapBehaviour::Reject => {
                warn!(
                    %reason,
                    "a workflow run is already active; rejecting overlapping trigger"
                );
                false
            }
            OverlapBehaviour::Queue => {
                self.pending.push_back(reason);
                debug!(%reason, queued = self.pending.len(), "queued trigger (queue mode)");

                if self.pending.len() > self.max_len {
                    warn!(
                        queued = self.pending.len(),
                        max_len = self.max_len,
                        "exceeded queue_length; dropping oldest queued triggers"
                    );
                    while self.pending.len() > self.max_len {
                        self.pending.pop_front();
                    }
                }
                true
            }
        }
    }

    /// Take the next queued trigger, if any.
    pub fn pop_next(&mut self) -> Option<TriggerReason> {
        let next = self.pending.pop_front();
        if let Some(reason) = next {
            debug!(%reason, remaining = self.pending.len(), "dequeued trigger");
        }
        next
    }

    /// Forget every queued trigger.
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "clearing queued triggers");
        }
        self.pending.clear();
    }
}
