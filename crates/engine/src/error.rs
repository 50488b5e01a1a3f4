//! Engine-level error types.

use thiserror::Error;

/// Errors that surface to the caller of the engine.
///
/// Failures *inside* a producer run never appear here — they are written
/// into the run's derived node as `Error: …` text (see [`crate::executor`]).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The triggered node vanished before the run could start.  Guard
    /// condition: the run aborts with no visible graph effect.
    #[error("node '{0}' not found in the graph")]
    NodeNotFound(String),

    /// The triggered node is not a producer variant (LLM / HTTP).
    #[error("node '{0}' is not a producer node")]
    NotAProducer(String),

    /// A snapshot failed to parse or validate; nothing was applied.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),

    /// Serializing the current graph to snapshot JSON failed.
    #[error("failed to serialize snapshot: {0}")]
    SnapshotSerialize(#[source] serde_json::Error),
}

/// A failure local to one producer run.
///
/// The taxonomy the coordinator cares about:
/// - `EmptyPrompt` — validation; the external capability is never invoked.
/// - `HttpStatus`  — the request completed with a non-success status.
/// - `Provider`    — the external capability itself failed.
///
/// The `Display` form of each variant becomes the derived node's text,
/// prefixed `"Error: "`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Prompt is empty after variable substitution.")]
    EmptyPrompt,

    #[error("HTTP error! status: {status} {status_text}\n\n{body}")]
    HttpStatus {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error(transparent)]
    Provider(#[from] providers::ProviderError),
}
