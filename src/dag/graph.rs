// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task_info::{NodeKind, TaskName, TaskNode, TriggerRule};
use crate::errors::{Result, RetraindagError};
use crate::workflow::ContextKey;

/// Internal node structure: the static definition plus its direct dependents.
#[derive(Debug, Clone)]
struct GraphEntry {
    node: TaskNode,
    /// Direct dependents: nodes that list this one in `after`.
    dependents: Vec<TaskName>,
}

/// Immutable, validated task graph.
///
/// Built once at startup through [`GraphBuilder`] and shared by every run.
/// Runs never touch the graph; per-run state lives in the
/// [`WorkflowRun`](crate::workflow::WorkflowRun).
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: HashMap<TaskName, GraphEntry>,
    order: Vec<TaskName>,
    entry: TaskName,
}

impl TaskGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    /// The unique node with no upstream dependency.
    pub fn entry_node(&self) -> &TaskNode {
        // `build` guarantees the entry exists.
        &self.nodes[&self.entry].node
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name).map(|e| &e.node)
    }

    /// Node names in a fixed topological order.
    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of a node (the names in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|e| e.node.deps())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|e| e.dependents.as_slice())
            .unwrap_or(&[])
    }
}

/// Collects node definitions and validates them into a [`TaskGraph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TaskNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: TaskNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Validate and freeze the graph.
    ///
    /// Checks for:
    /// - duplicate names, unknown or repeated dependencies,
    /// - cycles,
    /// - a single entry node,
    /// - branch outcomes that are labeled, unique and exhaustive,
    /// - context keys with a single producer that is guaranteed to have
    ///   succeeded before any reader starts.
    pub fn build(self) -> Result<TaskGraph> {
        ensure_has_nodes(&self.nodes)?;
        ensure_unique_names(&self.nodes)?;
        validate_dependencies(&self.nodes)?;
        validate_kinds(&self.nodes)?;
        let order = topological_order(&self.nodes)?;

        let mut nodes: HashMap<TaskName, GraphEntry> = self
            .nodes
            .into_iter()
            .map(|node| {
                let entry = GraphEntry {
                    node,
                    dependents: Vec::new(),
                };
                (entry.node.name().to_string(), entry)
            })
            .collect();

        // Populate dependents in topological order so their order is stable.
        for name in &order {
            let deps = nodes[name].node.deps().to_vec();
            for dep in deps {
                if let Some(dep_entry) = nodes.get_mut(&dep) {
                    dep_entry.dependents.push(name.clone());
                }
            }
        }

        let entry = single_entry(&nodes, &order)?;
        validate_branches(&nodes)?;
        validate_context_keys(&nodes, &order)?;

        Ok(TaskGraph {
            nodes,
            order,
            entry,
        })
    }
}

fn graph_error(msg: String) -> RetraindagError {
    RetraindagError::GraphError(msg)
}

fn ensure_has_nodes(nodes: &[TaskNode]) -> Result<()> {
    if nodes.is_empty() {
        return Err(graph_error("graph must contain at least one node".to_string()));
    }
    Ok(())
}

fn ensure_unique_names(nodes: &[TaskNode]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.name()) {
            return Err(graph_error(format!("duplicate node name '{}'", node.name())));
        }
    }
    Ok(())
}

fn validate_dependencies(nodes: &[TaskNode]) -> Result<()> {
    let names: HashSet<&str> = nodes.iter().map(|n| n.name()).collect();

    for node in nodes {
        let mut seen = HashSet::new();
        for dep in node.deps() {
            if dep == node.name() {
                return Err(graph_error(format!(
                    "node '{}' cannot depend on itself",
                    node.name()
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(graph_error(format!(
                    "node '{}' has unknown dependency '{}'",
                    node.name(),
                    dep
                )));
            }
            if !seen.insert(dep.as_str()) {
                return Err(graph_error(format!(
                    "node '{}' lists dependency '{}' more than once",
                    node.name(),
                    dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_kinds(nodes: &[TaskNode]) -> Result<()> {
    for node in nodes {
        match node.kind() {
            NodeKind::Action if !node.outcomes().is_empty() => {
                return Err(graph_error(format!(
                    "action node '{}' declares branch outcomes",
                    node.name()
                )));
            }
            NodeKind::Branch if node.outcomes().is_empty() => {
                return Err(graph_error(format!(
                    "branch node '{}' declares no outcomes",
                    node.name()
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn topological_order(nodes: &[TaskNode]) -> Result<Vec<TaskName>> {
    // Edge direction: dep -> node.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node.name());
    }
    for node in nodes {
        for dep in node.deps() {
            graph.add_edge(dep.as_str(), node.name(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(RetraindagError::DagCycle(format!(
            "cycle detected in task graph involving node '{}'",
            cycle.node_id()
        ))),
    }
}

fn single_entry(nodes: &HashMap<TaskName, GraphEntry>, order: &[TaskName]) -> Result<TaskName> {
    let roots: Vec<&TaskName> = order
        .iter()
        .filter(|name| nodes[*name].node.deps().is_empty())
        .collect();

    match roots.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(graph_error("graph has no entry node".to_string())),
        many => Err(graph_error(format!(
            "graph must have a single entry node, found {}: {:?}",
            many.len(),
            many
        ))),
    }
}

/// Every label maps to one or more direct dependents, and every direct
/// dependent is claimed by exactly one label.
fn validate_branches(nodes: &HashMap<TaskName, GraphEntry>) -> Result<()> {
    for entry in nodes.values() {
        let node = &entry.node;
        if !node.is_branch() {
            continue;
        }

        let dependents: BTreeSet<&str> = entry.dependents.iter().map(String::as_str).collect();
        let mut labels = HashSet::new();
        let mut claimed: BTreeMap<&str, usize> = BTreeMap::new();

        for outcome in node.outcomes() {
            if !labels.insert(outcome.label) {
                return Err(graph_error(format!(
                    "branch '{}' declares label '{}' more than once",
                    node.name(),
                    outcome.label
                )));
            }
            if outcome.targets.is_empty() {
                return Err(graph_error(format!(
                    "branch '{}' label '{}' has no target nodes",
                    node.name(),
                    outcome.label
                )));
            }
            for target in &outcome.targets {
                if !dependents.contains(target.as_str()) {
                    return Err(graph_error(format!(
                        "branch '{}' label '{}' targets '{}', which does not list '{}' in `after`",
                        node.name(),
                        outcome.label,
                        target,
                        node.name()
                    )));
                }
                *claimed.entry(target.as_str()).or_default() += 1;
            }
        }

        for dependent in dependents {
            match claimed.get(dependent).copied().unwrap_or(0) {
                1 => {}
                0 => {
                    return Err(graph_error(format!(
                        "branch '{}' has unlabeled edge to '{}'",
                        node.name(),
                        dependent
                    )));
                }
                _ => {
                    return Err(graph_error(format!(
                        "branch '{}' routes more than one label to '{}'",
                        node.name(),
                        dependent
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Each key has at most one producer, and each read is produced by a node
/// that must have succeeded for the reader to start. Optional reads only
/// need their producer somewhere upstream.
///
/// The guaranteed-ancestor set of a node depends on its trigger rule:
/// - `AllSuccess`: union over upstream of `{u} ∪ guaranteed(u)`,
/// - `AnySuccess`: intersection of the same sets,
/// - `AllDone`: empty, since it runs whatever happened upstream.
fn validate_context_keys(nodes: &HashMap<TaskName, GraphEntry>, order: &[TaskName]) -> Result<()> {
    let mut producers: HashMap<ContextKey, &str> = HashMap::new();
    for name in order {
        let node = &nodes[name].node;
        for key in node.write_keys() {
            if let Some(existing) = producers.insert(*key, node.name()) {
                return Err(graph_error(format!(
                    "context key '{}' is written by both '{}' and '{}'",
                    key,
                    existing,
                    node.name()
                )));
            }
        }
    }

    let mut guaranteed: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut ancestors: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for name in order {
        let node = &nodes[name].node;
        let upstream: BTreeSet<&str> = node
            .deps()
            .iter()
            .flat_map(|dep| {
                let mut set = ancestors.get(dep.as_str()).cloned().unwrap_or_default();
                set.insert(dep.as_str());
                set
            })
            .collect();

        let upstream_sets = node.deps().iter().map(|dep| {
            let mut set = guaranteed.get(dep.as_str()).cloned().unwrap_or_default();
            set.insert(dep.as_str());
            set
        });

        let set: BTreeSet<&str> = match node.trigger() {
            TriggerRule::AllSuccess => upstream_sets.flatten().collect(),
            TriggerRule::AnySuccess => upstream_sets
                .reduce(|acc, s| acc.intersection(&s).copied().collect())
                .unwrap_or_default(),
            TriggerRule::AllDone => BTreeSet::new(),
        };

        for key in node.read_keys() {
            match producers.get(key) {
                None => {
                    return Err(graph_error(format!(
                        "node '{}' reads context key '{}' which no node writes",
                        node.name(),
                        key
                    )));
                }
                Some(producer) if !set.contains(producer) => {
                    return Err(graph_error(format!(
                        "node '{}' reads context key '{}' but its producer '{}' is not guaranteed to run first",
                        node.name(),
                        key,
                        producer
                    )));
                }
                Some(_) => {}
            }
        }

        for key in node.optional_read_keys() {
            match producers.get(key) {
                None => {
                    return Err(graph_error(format!(
                        "node '{}' reads context key '{}' which no node writes",
                        node.name(),
                        key
                    )));
                }
                Some(producer) if !upstream.contains(producer) => {
                    return Err(graph_error(format!(
                        "node '{}' reads context key '{}' but its producer '{}' is not upstream",
                        node.name(),
                        key,
                        producer
                    )));
                }
                Some(_) => {}
            }
        }

        guaranteed.insert(node.name(), set);
        ancestors.insert(node.name(), upstream);
    }
    Ok(())
}
