//! The graph store — the only shared mutable resource in the engine.
//!
//! The store is never locked across a suspension point.  Safety for
//! concurrent producer runs comes from two properties instead:
//! - every mutation is a pure "update the matching id" transform applied
//!   atomically against the *current* graph, never a whole-array replace
//!   from a stale copy;
//! - each run's derived node/edge carries a run-unique id, so concurrent
//!   runs' writes compose instead of clobbering each other.

use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use crate::models::{FlowEdge, FlowNode};

#[derive(Default)]
struct GraphState {
    name: String,
    description: String,
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    /// The raw global-variables text as the user entered it.  Kept verbatim
    /// for export even when it is not valid JSON.
    global_source: String,
    /// The parsed form of `global_source`; an empty object when the source
    /// fails to parse.
    globals: Value,
}

/// Owned store of nodes, edges, and the global variable source.
///
/// Exposes only atomic primitives: append a node/edge, replace the entry
/// whose id matches.  Callers hold ids, never references into the store.
pub struct GraphStore {
    state: Mutex<GraphState>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState {
                globals: Value::Object(Default::default()),
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphState> {
        // A poisoned lock means a panic mid-mutation; the graph data itself
        // is still a consistent Vec, so continue with it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Append a node to the graph.
    pub fn add_node(&self, node: FlowNode) {
        self.lock().nodes.push(node);
    }

    /// Replace the node whose id matches by applying `f` to it.
    /// Returns `false` if no node has that id (a deleted node, not an error).
    pub fn update_node(&self, id: &str, f: impl FnOnce(&mut FlowNode)) -> bool {
        let mut state = self.lock();
        match state.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    /// Clone the node with the given id out of the store.
    pub fn get_node(&self, id: &str) -> Option<FlowNode> {
        self.lock().nodes.iter().find(|n| n.id == id).cloned()
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Append an edge, or replace an existing edge with the same id.
    pub fn upsert_edge(&self, edge: FlowEdge) {
        let mut state = self.lock();
        match state.edges.iter_mut().find(|e| e.id == edge.id) {
            Some(existing) => *existing = edge,
            None => state.edges.push(edge),
        }
    }

    /// Replace the edge whose id matches by applying `f` to it.
    pub fn update_edge(&self, id: &str, f: impl FnOnce(&mut FlowEdge)) -> bool {
        let mut state = self.lock();
        match state.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                f(edge);
                true
            }
            None => false,
        }
    }

    /// Clone the edge with the given id out of the store.
    pub fn get_edge(&self, id: &str) -> Option<FlowEdge> {
        self.lock().edges.iter().find(|e| e.id == id).cloned()
    }

    // -----------------------------------------------------------------------
    // Whole-graph reads
    // -----------------------------------------------------------------------

    /// Snapshot read of the current nodes and edges.
    ///
    /// The clone is deliberate: a run works against a consistent view for a
    /// single traversal/substitution pass, then re-reads before later writes.
    pub fn graph(&self) -> (Vec<FlowNode>, Vec<FlowEdge>) {
        let state = self.lock();
        (state.nodes.clone(), state.edges.clone())
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    /// Replace the whole node/edge arrays.  Used only by snapshot import,
    /// which validates the snapshot in full before calling this.
    pub(crate) fn replace_graph(&self, nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) {
        let mut state = self.lock();
        state.nodes = nodes;
        state.edges = edges;
    }

    // -----------------------------------------------------------------------
    // Flow metadata
    // -----------------------------------------------------------------------

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.lock().name = name.into();
    }

    pub fn description(&self) -> String {
        self.lock().description.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.lock().description = description.into();
    }

    // -----------------------------------------------------------------------
    // Global variables
    // -----------------------------------------------------------------------

    /// Set the global-variables source text.
    ///
    /// The source is kept verbatim; if it is not valid JSON the parsed
    /// namespace degrades to an empty object rather than failing.
    pub fn set_global_source(&self, source: impl Into<String>) {
        let source = source.into();
        let globals = match serde_json::from_str::<Value>(&source) {
            Ok(value) => value,
            Err(e) => {
                warn!("global variables are not valid JSON ({e}); using an empty namespace");
                Value::Object(Default::default())
            }
        };
        let mut state = self.lock();
        state.global_source = source;
        state.globals = globals;
    }

    /// The raw global-variables text, as last set.
    pub fn global_source(&self) -> String {
        self.lock().global_source.clone()
    }

    /// The parsed global store; empty object when the source is malformed.
    pub fn globals(&self) -> Value {
        self.lock().globals.clone()
    }
}
