//! Core domain models for the flow canvas.
//!
//! These types are the source of truth for what a flow looks like in
//! memory.  They serialise to/from the flat JSON snapshot format consumed
//! by import/export (see [`crate::snapshot`]).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// HTTP verb for a request node.  The method itself is never templated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    /// Whether a request with this method carries a body.
    pub fn carries_body(self) -> bool {
        matches!(self, Self::POST | Self::PUT | Self::PATCH)
    }

    /// The verb as an upper-case string, as sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
        }
    }
}

// ---------------------------------------------------------------------------
// NodeData
// ---------------------------------------------------------------------------

/// Variant payload of a node.
///
/// Consumers branch exhaustively on this discriminant; nothing probes for
/// field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeData {
    /// Static text.  The only variant that contributes a variable *value*.
    Text { text: String },
    /// An LLM prompt; running it streams generated text into a new node.
    LlmPrompt {
        prompt: String,
        temperature: f64,
        thinking_enabled: bool,
    },
    /// An HTTP request; running it fetches a response into a new node.
    HttpRequest {
        method: HttpMethod,
        url: String,
        headers: String,
        body: String,
    },
}

impl NodeData {
    /// Producer nodes perform an external call when triggered.
    pub fn is_producer(&self) -> bool {
        matches!(self, Self::LlmPrompt { .. } | Self::HttpRequest { .. })
    }
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Execution state of a producer node, consumed by presentation as the
/// "is loading" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Canvas position.  Kept so a spawned output node can be placed to the
/// right of its producer; exact placement is a presentation concern, not a
/// correctness contract.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// FlowNode
// ---------------------------------------------------------------------------

/// A single node on the canvas.
///
/// Identity is the `id`; no two nodes share an id at any time.  The core
/// never holds a long-lived reference to a node, only its id, and
/// re-resolves it against the store after every suspension point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    /// User-editable free text; the source of the node's variable name once
    /// sanitized.
    pub label: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    #[serde(default)]
    pub run_state: RunState,
}

impl FlowNode {
    /// Convenience constructor for a text node.
    pub fn text(id: impl Into<String>, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: Position::default(),
            data: NodeData::Text { text: text.into() },
            run_state: RunState::Idle,
        }
    }

    /// Convenience constructor for an LLM prompt node with default settings.
    pub fn llm_prompt(
        id: impl Into<String>,
        label: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: Position::default(),
            data: NodeData::LlmPrompt {
                prompt: prompt.into(),
                temperature: 0.7,
                thinking_enabled: true,
            },
            run_state: RunState::Idle,
        }
    }

    /// Convenience constructor for an HTTP request node.
    pub fn http_request(
        id: impl Into<String>,
        label: impl Into<String>,
        method: HttpMethod,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: Position::default(),
            data: NodeData::HttpRequest {
                method,
                url: url.into(),
                headers: String::new(),
                body: String::new(),
            },
            run_state: RunState::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// FlowEdge
// ---------------------------------------------------------------------------

/// Directed edge from `source` to `target`.
///
/// Variable availability flows along the edge direction.  Dangling edges
/// (endpoints absent from the node set) are tolerated by traversal, never an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub animated: bool,
}

impl FlowEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            animated: false,
        }
    }
}
