//! The execution coordinator — drives one producer node's run.
//!
//! `Coordinator` is the central orchestrator:
//! 1. Guards that the triggered node still exists and is a producer.
//! 2. Flips the producer into `Running`.
//! 3. Resolves ancestors and substitutes variables into the payload.
//! 4. Spawns a derived output node plus an animated edge *before* the
//!    external call, so the pending state is observable immediately.
//! 5. Invokes the external capability (streaming LLM or HTTP request),
//!    mutating the derived node as results arrive.
//! 6. On failure writes `Error: …` into the derived node.
//! 7. Always restores the producer to `Idle` and stops the edge animation,
//!    on every path.
//!
//! No failure from a single run ever escapes that run's derived node; the
//! rest of the graph and the producer's own payload stay untouched.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{error, info, instrument};
use uuid::Uuid;

use providers::{GenerationConfig, RequestSender, RequestSpec, TextGenerator};

use crate::ancestry::find_ancestors;
use crate::error::{EngineError, RunError};
use crate::models::{FlowEdge, FlowNode, HttpMethod, NodeData, Position, RunState};
use crate::store::GraphStore;
use crate::template::substitute;
use crate::vars::local_values;

/// Horizontal offset of a spawned output node from its producer.
const SPAWN_OFFSET_X: f64 = 420.0;

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Terminal state of one producer run.
#[derive(Debug)]
pub enum RunStatus {
    Succeeded,
    Failed(RunError),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// The result of one producer run.
///
/// The derived node and edge are ordinary graph entities with no special
/// status once the run terminates; their ids are returned so callers can
/// locate the output.
#[derive(Debug)]
pub struct RunOutcome {
    pub derived_node_id: String,
    pub derived_edge_id: String,
    pub status: RunStatus,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Orchestrates producer runs against a shared [`GraphStore`].
///
/// Holds only capabilities and the store; per-run state lives on the stack
/// of [`Coordinator::run_node`], so concurrent runs are independent.
pub struct Coordinator {
    store: Arc<GraphStore>,
    generator: Arc<dyn TextGenerator>,
    http: Arc<dyn RequestSender>,
}

impl Coordinator {
    pub fn new(
        store: Arc<GraphStore>,
        generator: Arc<dyn TextGenerator>,
        http: Arc<dyn RequestSender>,
    ) -> Self {
        Self {
            store,
            generator,
            http,
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Run the producer node with the given id.
    ///
    /// # Errors
    /// [`EngineError::NodeNotFound`] / [`EngineError::NotAProducer`] when
    /// the guard fails; both abort before any graph mutation.  Failures
    /// during the run itself are reported through [`RunOutcome::status`]
    /// and the derived node's text, never as an `Err`.
    #[instrument(skip(self))]
    pub async fn run_node(&self, node_id: &str) -> Result<RunOutcome, EngineError> {
        // ------------------------------------------------------------------
        // Guard: the node must still exist and must be a producer.
        // ------------------------------------------------------------------
        let producer = self
            .store
            .get_node(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_owned()))?;
        if !producer.data.is_producer() {
            return Err(EngineError::NotAProducer(node_id.to_owned()));
        }

        // ------------------------------------------------------------------
        // Enter Running.
        // ------------------------------------------------------------------
        self.store
            .update_node(node_id, |n| n.run_state = RunState::Running);

        // ------------------------------------------------------------------
        // Resolve inputs: ancestors → local values, plus the global store.
        // ------------------------------------------------------------------
        let (nodes, edges) = self.store.graph();
        let ancestors = find_ancestors(node_id, &nodes, &edges);
        let locals = local_values(&ancestors);
        let globals = self.store.globals();

        // ------------------------------------------------------------------
        // Spawn the derived node and its animated edge before the external
        // call begins.
        // ------------------------------------------------------------------
        let (output_label, placeholder) = match &producer.data {
            NodeData::LlmPrompt { .. } => ("LLM Output", "⏳ Generating..."),
            NodeData::HttpRequest { .. } => ("HTTP Response", "⏳ Sending..."),
            NodeData::Text { .. } => unreachable!("guarded above"),
        };

        let derived_id = format!("textnode_{}_{}", node_id, Uuid::new_v4());
        let mut derived = FlowNode::text(&derived_id, output_label, placeholder);
        derived.position = Position {
            x: producer.position.x + SPAWN_OFFSET_X,
            y: producer.position.y,
        };
        self.store.add_node(derived);

        let edge_id = format!("edge_{}_{}", node_id, derived_id);
        let mut edge = FlowEdge::new(&edge_id, node_id, &derived_id);
        edge.animated = true;
        self.store.upsert_edge(edge);

        // ------------------------------------------------------------------
        // Invoke the capability for this producer variant.
        // ------------------------------------------------------------------
        let result = match producer.data {
            NodeData::LlmPrompt {
                prompt,
                temperature,
                thinking_enabled,
            } => {
                let final_prompt = substitute(&prompt, &locals, &globals);
                self.run_llm(&derived_id, &final_prompt, temperature, thinking_enabled)
                    .await
            }
            NodeData::HttpRequest {
                method,
                url,
                headers,
                body,
            } => {
                let final_url = substitute(&url, &locals, &globals);
                let final_headers = substitute(&headers, &locals, &globals);
                // The body is only templated (and only sent) for methods
                // that carry one.
                let final_body = if method.carries_body() {
                    Some(substitute(&body, &locals, &globals))
                } else {
                    None
                };
                self.run_http(&derived_id, method, final_url, final_headers, final_body)
                    .await
            }
            NodeData::Text { .. } => unreachable!("guarded above"),
        };

        // ------------------------------------------------------------------
        // Resolve the outcome into the derived node's text.
        // ------------------------------------------------------------------
        let status = match result {
            Ok(()) => {
                info!(node_id, derived_id = %derived_id, "producer run succeeded");
                RunStatus::Succeeded
            }
            Err(run_err) => {
                error!(node_id, derived_id = %derived_id, "producer run failed: {run_err}");
                self.set_derived_text(&derived_id, format!("Error: {run_err}"));
                RunStatus::Failed(run_err)
            }
        };

        // ------------------------------------------------------------------
        // Exit Running — every path ends here.
        // ------------------------------------------------------------------
        self.store
            .update_node(node_id, |n| n.run_state = RunState::Idle);
        self.store.update_edge(&edge_id, |e| e.animated = false);

        Ok(RunOutcome {
            derived_node_id: derived_id,
            derived_edge_id: edge_id,
            status,
        })
    }

    // -----------------------------------------------------------------------
    // LLM variant
    // -----------------------------------------------------------------------

    async fn run_llm(
        &self,
        derived_id: &str,
        prompt: &str,
        temperature: f64,
        thinking_enabled: bool,
    ) -> Result<(), RunError> {
        // Validation failure: the capability is never invoked.
        if prompt.trim().is_empty() {
            return Err(RunError::EmptyPrompt);
        }

        let config = GenerationConfig {
            temperature: Some(temperature),
            thinking_enabled: Some(thinking_enabled),
        };

        let mut stream = self.generator.generate_stream(prompt, &config).await?;

        // Every chunk yields one visible graph mutation; no batching.
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            buffer.push_str(&chunk?);
            self.set_derived_text(derived_id, buffer.clone());
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // HTTP variant
    // -----------------------------------------------------------------------

    async fn run_http(
        &self,
        derived_id: &str,
        method: HttpMethod,
        url: String,
        headers: String,
        body: Option<String>,
    ) -> Result<(), RunError> {
        let request = RequestSpec {
            method: method.as_str().to_owned(),
            url,
            headers: parse_header_block(&headers),
            body,
        };

        let response = self.http.send(request).await?;

        if !response.is_success() {
            return Err(RunError::HttpStatus {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            });
        }

        // Pretty-print JSON bodies; anything else is used verbatim.  This
        // is a formatting fallback, not an error.
        let formatted = match serde_json::from_str::<Value>(&response.body) {
            Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(response.body),
            Err(_) => response.body,
        };
        self.set_derived_text(derived_id, formatted);

        Ok(())
    }

    /// Overwrite the derived node's text, re-resolving the node by id.
    fn set_derived_text(&self, derived_id: &str, text: String) {
        self.store.update_node(derived_id, |n| {
            if let NodeData::Text { text: current } = &mut n.data {
                *current = text;
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Header block parsing
// ---------------------------------------------------------------------------

/// Parse a newline-delimited `Key: Value` block.
///
/// Each line splits at the first colon; lines without a colon or without a
/// non-empty key are dropped.  Keys and values are trimmed; a value may be
/// empty.
pub fn parse_header_block(block: &str) -> Vec<(String, String)> {
    block
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_owned(), value.trim().to_owned()))
        })
        .collect()
}
