#![allow(dead_code)]

pub use retraindag_test_utils::builders;
pub use retraindag_test_utils::{init_tracing, with_timeout};

use retraindag::dag::{BranchLabel, TaskNode};

/// `start -> decide -+-[commit]---> keep ----+-> report (all-done)
///                   +-[rollback]-> revert --+`
pub fn diamond_branch_nodes() -> Vec<TaskNode> {
    vec![
        TaskNode::action("start"),
        TaskNode::branch("decide")
            .after("start")
            .outcome(BranchLabel::Commit, ["keep"])
            .outcome(BranchLabel::Rollback, ["revert"]),
        TaskNode::action("keep").after("decide"),
        TaskNode::action("revert").after("decide"),
        TaskNode::action("report")
            .after("keep")
            .after("revert")
            .trigger_rule(retraindag::dag::TriggerRule::AllDone),
    ]
}
