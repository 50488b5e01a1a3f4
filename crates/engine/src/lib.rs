//! `engine` crate — the variable-scoped dataflow execution engine.
//!
//! Core pieces:
//! - [`models`] — the shared data model (nodes, edges, payload variants).
//! - [`store`] — the graph store with atomic upsert-by-id mutations.
//! - [`ancestry`] — breadth-first ancestor discovery over incoming edges.
//! - [`vars`] — the two-tier (local + global) variable namespace.
//! - [`template`] — `$token` substitution.
//! - [`executor`] — the producer-run state machine.
//! - [`snapshot`] — flat JSON import/export.

pub mod ancestry;
pub mod error;
pub mod executor;
pub mod models;
pub mod snapshot;
pub mod store;
pub mod template;
pub mod vars;

pub use ancestry::find_ancestors;
pub use error::{EngineError, RunError};
pub use executor::{Coordinator, RunOutcome, RunStatus};
pub use models::{FlowEdge, FlowNode, HttpMethod, NodeData, Position, RunState};
pub use snapshot::FlowSnapshot;
pub use store::GraphStore;
pub use template::substitute;

#[cfg(test)]
mod executor_tests;
