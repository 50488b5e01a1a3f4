//! Ancestor discovery over the node/edge graph.
//!
//! Ancestors form the candidate variable-source set for a producer run:
//! every node transitively reachable by walking incoming edges backward.

use std::collections::{HashSet, VecDeque};

use crate::models::{FlowEdge, FlowNode};

/// Find all ancestors of `node_id` by breadth-first search over incoming
/// edges.
///
/// Guarantees:
/// - the starting node is never part of the result;
/// - a visited-id set makes the walk terminate even if the graph contains a
///   cycle reachable from `node_id` (the cycle simply stops re-expanding);
/// - edges whose `source` is absent from `nodes` are skipped silently.
///
/// The result is in discovery order (breadth layers) but callers must treat
/// it as a set; nothing may depend on the ordering.
pub fn find_ancestors(node_id: &str, nodes: &[FlowNode], edges: &[FlowEdge]) -> Vec<FlowNode> {
    let mut ancestors: Vec<FlowNode> = Vec::new();
    let mut collected: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([node_id]);

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }

        for edge in edges.iter().filter(|e| e.target == current) {
            if visited.contains(edge.source.as_str()) {
                continue;
            }
            // Dangling edge: source node no longer exists. Skip, never error.
            let Some(source) = nodes.iter().find(|n| n.id == edge.source) else {
                continue;
            };
            if collected.insert(source.id.as_str()) {
                ancestors.push(source.clone());
            }
            queue.push_back(&edge.source);
        }
    }

    ancestors
}
