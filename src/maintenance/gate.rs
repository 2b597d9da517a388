// src/maintenance/gate.rs

use crate::dag::BranchLabel;

/// Accuracy gate shared by the pre- and post-retrain decisions.
///
/// Readings and threshold are both fractions in `[0, 1]`; a reading equal to
/// the threshold passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyGate {
    threshold: f64,
}

impl AccuracyGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn passes(&self, accuracy: f64) -> bool {
        accuracy >= self.threshold
    }

    /// Decision of `check_accuracy`: keep the current model or back it up
    /// before retraining.
    pub fn pre_retrain(&self, accuracy: f64) -> BranchLabel {
        if self.passes(accuracy) {
            BranchLabel::Noop
        } else {
            BranchLabel::Backup
        }
    }

    /// Decision of `validate`: keep the retrained model or restore the backup.
    pub fn post_retrain(&self, accuracy: f64) -> BranchLabel {
        if self.passes(accuracy) {
            BranchLabel::Commit
        } else {
            BranchLabel::Rollback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let gate = AccuracyGate::new(0.85);
        assert_eq!(gate.pre_retrain(0.85), BranchLabel::Noop);
        assert_eq!(gate.post_retrain(0.85), BranchLabel::Commit);
    }

    #[test]
    fn below_threshold_takes_the_corrective_path() {
        let gate = AccuracyGate::new(0.85);
        assert_eq!(gate.pre_retrain(0.70), BranchLabel::Backup);
        assert_eq!(gate.post_retrain(0.60), BranchLabel::Rollback);
    }
}
