//! Topological sequencing — run this before executing a workflow.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the workflow.
//! 2. The `dependsOn` graph must be acyclic; entries naming absent nodes are
//!    reported as part of the cycle set (their in-degree never drains).
//!
//! Returns a topologically-sorted list of node IDs on success. Ties between
//! simultaneously-ready nodes break by declaration order, so the output is
//! deterministic whenever multiple valid orderings exist.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{models::WorkflowNode, EngineError};

/// Compute a linear execution order consistent with all `dependsOn` edges.
///
/// # Errors
/// - [`EngineError::DuplicateNode`] if two nodes share an ID.
/// - [`EngineError::Cycle`] naming every node that cannot be ordered.
pub fn sequence(nodes: &[WorkflowNode]) -> Result<Vec<String>, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNode(node.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Kahn's algorithm
    // -----------------------------------------------------------------------
    // In-degree of a node is the count of its own declared dependencies;
    // dependents map each node to the nodes that list it in `dependsOn`.
    let mut in_degree: HashMap<&str, usize> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.depends_on.len()))
        .collect();

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        for dep in &node.depends_on {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(node.id.as_str());
        }
    }

    // Seed the queue with zero-in-degree nodes, in declaration order.
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .filter(|n| n.depends_on.is_empty())
        .map(|n| n.id.as_str())
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        if let Some(children) = dependents.get(node_id) {
            for &child in children {
                if let Some(deg) = in_degree.get_mut(child) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
    }

    // Any node whose in-degree never drained is part of a cycle, or depends
    // on a node that does not exist.
    if sorted.len() != nodes.len() {
        let stuck: Vec<String> = nodes
            .iter()
            .filter(|n| in_degree[n.id.as_str()] > 0)
            .map(|n| n.id.clone())
            .collect();
        return Err(EngineError::Cycle { nodes: stuck });
    }

    Ok(sorted)
}
