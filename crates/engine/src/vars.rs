//! The two-tier variable namespace.
//!
//! "Local" names come from ancestor node labels; only Text ancestors
//! contribute a *value* (their text).  "Global" names are dotted paths
//! flattened out of the shared key/value store and are available
//! everywhere, with no ancestor relationship required.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{FlowNode, NodeData};

/// Prefix that marks a token as a global-store path.
pub const GLOBAL_PREFIX: &str = "global.";

// ---------------------------------------------------------------------------
// Local names
// ---------------------------------------------------------------------------

/// Sanitize a node label into a variable name by stripping every character
/// outside `[A-Za-z0-9]`.  Idempotent; may produce an empty string, in
/// which case the label yields no variable name.
pub fn sanitize_label(label: &str) -> String {
    label.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// The local name → value map for a producer run.
///
/// Only Text ancestors with a non-empty sanitized label contribute; their
/// text is the value.  LLM/HTTP ancestors are valid *names* for hinting but
/// are not variable sources.
pub fn local_values(ancestors: &[FlowNode]) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for node in ancestors {
        if let NodeData::Text { text } = &node.data {
            let name = sanitize_label(&node.label);
            if !name.is_empty() {
                values.insert(name, text.clone());
            }
        }
    }
    values
}

/// Candidate local variable names from any ancestor, regardless of variant.
pub fn local_names(ancestors: &[FlowNode]) -> Vec<String> {
    ancestors
        .iter()
        .map(|node| sanitize_label(&node.label))
        .filter(|name| !name.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Global names
// ---------------------------------------------------------------------------

/// Recursively flatten the global store into dotted paths.
///
/// Only plain objects are recursed into; arrays and every other value are
/// leaves.  Non-object roots flatten to nothing.
pub fn flatten_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    flatten_into(value, "", &mut paths);
    paths
}

fn flatten_into(value: &Value, prefix: &str, out: &mut Vec<String>) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match child {
            Value::Object(_) => flatten_into(child, &path, out),
            _ => out.push(path),
        }
    }
}

/// Every flattened global path, exposed with the `global.` prefix.
pub fn available_global_variables(globals: &Value) -> Vec<String> {
    flatten_paths(globals)
        .into_iter()
        .map(|path| format!("{GLOBAL_PREFIX}{path}"))
        .collect()
}

/// Safe nested lookup of a dotted path against the global store.
///
/// Returns `None` when any segment is missing or the path traverses into a
/// non-object.  Empty segments are skipped, so `"a..b"` resolves like
/// `"a.b"` and an all-empty path resolves to the root.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Combined listing
// ---------------------------------------------------------------------------

/// The full list of variable names available to a node, for UI hinting and
/// for deciding which `$token` occurrences are known.  Union of local and
/// global names, duplicates removed, first-appearance order.
pub fn available_variables(ancestors: &[FlowNode], globals: &Value) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    local_names(ancestors)
        .into_iter()
        .chain(available_global_variables(globals))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
