// tests/graph_validation.rs

mod common;

use retraindag::dag::{BranchLabel, FailurePolicy, NodeKind, TaskGraph, TaskNode, TriggerRule};
use retraindag::errors::RetraindagError;
use retraindag::maintenance::{maintenance_graph, nodes};
use retraindag::workflow::ContextKey;

fn build(nodes: Vec<TaskNode>) -> Result<TaskGraph, RetraindagError> {
    nodes
        .into_iter()
        .fold(TaskGraph::builder(), |b, n| b.node(n))
        .build()
}

fn graph_error(result: Result<TaskGraph, RetraindagError>) -> String {
    match result {
        Err(RetraindagError::GraphError(msg)) => msg,
        other => panic!("expected GraphError, got {other:?}"),
    }
}

#[test]
fn maintenance_graph_is_valid() {
    let graph = maintenance_graph().expect("maintenance graph must build");

    assert_eq!(graph.len(), 10);
    assert_eq!(graph.entry_node().name(), nodes::GET_TOKEN);

    let order = graph.topological_order();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(pos(nodes::GET_TOKEN) < pos(nodes::RELOAD_DATA));
    assert!(pos(nodes::RELOAD_DATA) < pos(nodes::CHECK_ACCURACY));
    assert!(pos(nodes::BACKUP) < pos(nodes::RETRAIN));
    assert!(pos(nodes::RETRAIN) < pos(nodes::VALIDATE));
    assert!(pos(nodes::COMMIT) < pos(nodes::NOTIFY));
    assert!(pos(nodes::ROLLBACK) < pos(nodes::NOTIFY));
    assert!(pos(nodes::NOOP) < pos(nodes::NOTIFY));

    let check = graph.node(nodes::CHECK_ACCURACY).unwrap();
    assert_eq!(check.kind(), NodeKind::Branch);
    assert_eq!(
        check.targets_of(BranchLabel::Backup),
        Some(&[nodes::BACKUP.to_string()][..])
    );

    let notify = graph.node(nodes::NOTIFY).unwrap();
    assert_eq!(notify.trigger(), TriggerRule::AllDone);

    assert_eq!(
        graph.node(nodes::GET_TOKEN).unwrap().failure_policy(),
        FailurePolicy::AbortRun
    );
    assert_eq!(
        graph.node(nodes::ROLLBACK).unwrap().failure_policy(),
        FailurePolicy::AbortRun
    );

    let mut dependents = graph.dependents_of(nodes::VALIDATE).to_vec();
    dependents.sort();
    assert_eq!(dependents, vec![nodes::COMMIT, nodes::ROLLBACK]);
}

#[test]
fn cycle_is_reported_as_dag_cycle() {
    let result = build(vec![
        TaskNode::action("a"),
        TaskNode::action("b").after("a").after("c"),
        TaskNode::action("c").after("b"),
    ]);

    match result {
        Err(RetraindagError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let msg = graph_error(build(vec![TaskNode::action("a").after("ghost")]));
    assert!(msg.contains("unknown dependency 'ghost'"), "{msg}");
}

#[test]
fn self_dependency_is_rejected() {
    let msg = graph_error(build(vec![TaskNode::action("a").after("a")]));
    assert!(msg.contains("cannot depend on itself"), "{msg}");
}

#[test]
fn duplicate_names_are_rejected() {
    let msg = graph_error(build(vec![TaskNode::action("a"), TaskNode::action("a")]));
    assert!(msg.contains("duplicate node name 'a'"), "{msg}");
}

#[test]
fn empty_graph_is_rejected() {
    let msg = graph_error(TaskGraph::builder().build());
    assert!(msg.contains("at least one node"), "{msg}");
}

#[test]
fn multiple_entry_nodes_are_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::action("a"),
        TaskNode::action("b"),
        TaskNode::action("c").after("a").after("b"),
    ]));
    assert!(msg.contains("single entry node"), "{msg}");
}

#[test]
fn branch_with_unlabeled_dependent_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::branch("decide").outcome(BranchLabel::Commit, ["keep"]),
        TaskNode::action("keep").after("decide"),
        TaskNode::action("stray").after("decide"),
    ]));
    assert!(msg.contains("unlabeled edge to 'stray'"), "{msg}");
}

#[test]
fn branch_targeting_a_non_dependent_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::branch("decide")
            .outcome(BranchLabel::Commit, ["keep"])
            .outcome(BranchLabel::Rollback, ["elsewhere"]),
        TaskNode::action("keep").after("decide"),
        TaskNode::action("elsewhere").after("keep"),
    ]));
    assert!(msg.contains("targets 'elsewhere'"), "{msg}");
}

#[test]
fn duplicate_branch_label_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::branch("decide")
            .outcome(BranchLabel::Commit, ["keep"])
            .outcome(BranchLabel::Commit, ["other"]),
        TaskNode::action("keep").after("decide"),
        TaskNode::action("other").after("decide"),
    ]));
    assert!(msg.contains("more than once"), "{msg}");
}

#[test]
fn dependent_claimed_by_two_labels_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::branch("decide")
            .outcome(BranchLabel::Commit, ["keep"])
            .outcome(BranchLabel::Rollback, ["keep"]),
        TaskNode::action("keep").after("decide"),
    ]));
    assert!(msg.contains("more than one label"), "{msg}");
}

#[test]
fn branch_without_outcomes_and_action_with_outcomes_are_rejected() {
    let msg = graph_error(build(vec![TaskNode::branch("decide")]));
    assert!(msg.contains("declares no outcomes"), "{msg}");

    let msg = graph_error(build(vec![
        TaskNode::action("a").outcome(BranchLabel::Noop, ["b"]),
        TaskNode::action("b").after("a"),
    ]));
    assert!(msg.contains("declares branch outcomes"), "{msg}");
}

#[test]
fn context_key_with_two_producers_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::action("a").writes(ContextKey::Token),
        TaskNode::action("b").after("a").writes(ContextKey::Token),
    ]));
    assert!(msg.contains("written by both"), "{msg}");
}

#[test]
fn read_without_producer_is_rejected() {
    let msg = graph_error(build(vec![
        TaskNode::action("a"),
        TaskNode::action("b").after("a").reads(ContextKey::PreAccuracy),
    ]));
    assert!(msg.contains("which no node writes"), "{msg}");
}

#[test]
fn read_through_all_done_is_not_guaranteed() {
    let msg = graph_error(build(vec![
        TaskNode::action("a").writes(ContextKey::Token),
        TaskNode::action("b")
            .after("a")
            .trigger_rule(TriggerRule::AllDone)
            .reads(ContextKey::Token),
    ]));
    assert!(msg.contains("not guaranteed to run first"), "{msg}");
}

#[test]
fn read_through_any_success_needs_the_producer_on_every_path() {
    // `join` may start after only `left` succeeded, so `right`'s key is not
    // guaranteed; the entry's key is.
    let nodes = || {
        vec![
            TaskNode::action("entry").writes(ContextKey::Token),
            TaskNode::action("left").after("entry"),
            TaskNode::action("right")
                .after("entry")
                .writes(ContextKey::PreAccuracy),
        ]
    };

    let mut ok = nodes();
    ok.push(
        TaskNode::action("join")
            .after("left")
            .after("right")
            .trigger_rule(TriggerRule::AnySuccess)
            .reads(ContextKey::Token),
    );
    assert!(build(ok).is_ok());

    let mut bad = nodes();
    bad.push(
        TaskNode::action("join")
            .after("left")
            .after("right")
            .trigger_rule(TriggerRule::AnySuccess)
            .reads(ContextKey::PreAccuracy),
    );
    let msg = graph_error(build(bad));
    assert!(msg.contains("'right' is not guaranteed"), "{msg}");
}

#[test]
fn transitive_reads_are_guaranteed_through_all_success() {
    let graph = build(vec![
        TaskNode::action("a").writes(ContextKey::Token),
        TaskNode::action("b").after("a"),
        TaskNode::action("c").after("b").reads(ContextKey::Token),
    ])
    .expect("transitive ancestor is guaranteed");

    assert_eq!(graph.dependencies_of("c"), &["b".to_string()]);
}

#[test]
fn maintenance_nodes_declare_every_key_they_read() {
    let graph = maintenance_graph().expect("maintenance graph must build");

    let validate = graph.node(nodes::VALIDATE).unwrap();
    assert_eq!(
        validate.read_keys(),
        &[ContextKey::Token, ContextKey::PreAccuracy]
    );

    let notify = graph.node(nodes::NOTIFY).unwrap();
    assert!(notify.read_keys().is_empty());
    assert_eq!(
        notify.optional_read_keys(),
        &[ContextKey::PreAccuracy, ContextKey::PostAccuracy]
    );
    assert!(!notify.may_read(ContextKey::Token));
}

#[test]
fn optional_read_through_all_done_is_accepted() {
    let graph = build(vec![
        TaskNode::action("a").writes(ContextKey::PreAccuracy),
        TaskNode::action("b")
            .after("a")
            .trigger_rule(TriggerRule::AllDone)
            .reads_if_present(ContextKey::PreAccuracy),
    ]);
    assert!(graph.is_ok(), "{graph:?}");
}

#[test]
fn optional_read_needs_an_upstream_producer() {
    let msg = graph_error(build(vec![
        TaskNode::action("entry"),
        TaskNode::action("side")
            .after("entry")
            .writes(ContextKey::PostAccuracy),
        TaskNode::action("reader")
            .after("entry")
            .trigger_rule(TriggerRule::AllDone)
            .reads_if_present(ContextKey::PostAccuracy),
    ]));
    assert!(msg.contains("producer 'side' is not upstream"), "{msg}");

    let msg = graph_error(build(vec![
        TaskNode::action("entry"),
        TaskNode::action("reader")
            .after("entry")
            .reads_if_present(ContextKey::PostAccuracy),
    ]));
    assert!(msg.contains("which no node writes"), "{msg}");
}
