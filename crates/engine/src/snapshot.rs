//! Flat JSON snapshot import/export.
//!
//! A snapshot is the only persistence format: `nodes`, `edges`, and
//! optional `name` / `description` / `globalVariables` (the latter a
//! JSON-*encoded string*, not a nested object).  Import is all-or-nothing;
//! export masks secret-looking global values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::EngineError;
use crate::models::{FlowEdge, FlowNode};
use crate::store::GraphStore;

/// Substituted in place of masked global values on export.
const MASK: &str = "******** MASKED FOR EXPORT ********";

// ---------------------------------------------------------------------------
// FlowSnapshot
// ---------------------------------------------------------------------------

/// The persisted shape of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-encoded string, kept opaque here; the store parses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_variables: Option<String>,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Parse and apply a snapshot to the store.
///
/// `nodes` and `edges` must be arrays of well-formed entities or the whole
/// snapshot is rejected without partial application.  Absent optional
/// fields keep the store's current values.  A `globalVariables` string that
/// is not valid JSON degrades to an empty global namespace (handled by the
/// store), never an import failure.
///
/// # Errors
/// [`EngineError::InvalidSnapshot`] when the JSON does not match the
/// snapshot shape; the store is untouched in that case.
pub fn import_str(store: &GraphStore, json: &str) -> Result<(), EngineError> {
    let snapshot: FlowSnapshot = serde_json::from_str(json)?;
    apply(store, snapshot);
    Ok(())
}

/// Apply an already-parsed snapshot.
pub fn apply(store: &GraphStore, snapshot: FlowSnapshot) {
    store.replace_graph(snapshot.nodes, snapshot.edges);
    if let Some(name) = snapshot.name {
        store.set_name(name);
    }
    if let Some(description) = snapshot.description {
        store.set_description(description);
    }
    if let Some(globals) = snapshot.global_variables {
        store.set_global_source(globals);
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Capture the store as a snapshot, masking secret-looking global values.
pub fn capture(store: &GraphStore) -> FlowSnapshot {
    let (nodes, edges) = store.graph();
    FlowSnapshot {
        name: Some(store.name()),
        description: Some(store.description()),
        global_variables: Some(masked_global_source(store)),
        nodes,
        edges,
    }
}

/// Serialize the store to pretty-printed snapshot JSON.
///
/// # Errors
/// [`EngineError::SnapshotSerialize`] on serialization failure (not
/// expected for well-formed graphs).
pub fn export_string(store: &GraphStore) -> Result<String, EngineError> {
    serde_json::to_string_pretty(&capture(store)).map_err(EngineError::SnapshotSerialize)
}

fn masked_global_source(store: &GraphStore) -> String {
    let source = store.global_source();
    match serde_json::from_str::<Value>(&source) {
        Ok(parsed) => {
            let masked = mask_sensitive_values(parsed);
            serde_json::to_string_pretty(&masked).unwrap_or(source)
        }
        Err(_) => {
            // Can't parse, can't mask. Export the text as the user wrote it.
            warn!("global variables are not valid JSON; exporting them unmasked");
            source
        }
    }
}

/// Recursively replace values whose key looks like a credential.
fn mask_sensitive_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    let masked = if lower.contains("apikey")
                        || lower.contains("secret")
                        || lower.contains("token")
                    {
                        Value::String(MASK.to_owned())
                    } else {
                        mask_sensitive_values(val)
                    };
                    (key, masked)
                })
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(mask_sensitive_values).collect())
        }
        other => other,
    }
}
