//! The producer capability traits — the contract every provider must fulfil.
//!
//! The engine consumes providers as opaque capabilities: "given a prompt
//! and config, produce a lazy sequence of text chunks or fail"; "given a
//! request descriptor, produce a response or fail".

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Tuning knobs for text generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature (0.0–1.0).
    pub temperature: Option<f64>,
    /// `Some(false)` disables the model's thinking budget.
    pub thinking_enabled: Option<bool>,
}

/// A lazy, finite, non-restartable sequence of text chunks.  The stream may
/// fail at any point, including before the first chunk.
pub type TextStream = BoxStream<'static, Result<String, ProviderError>>;

/// Streaming text-generation capability.
///
/// Whole-result and streaming calls must apply equivalent config semantics.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate the whole result at once.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;

    /// Generate a stream of chunks, in order, terminated by end-of-stream
    /// or a failure item.
    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream, ProviderError>;
}

// ---------------------------------------------------------------------------
// HTTP requests
// ---------------------------------------------------------------------------

/// A fully-prepared request descriptor.  The engine substitutes variables
/// before constructing this; providers send it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Upper-case HTTP verb.
    pub method: String,
    pub url: String,
    /// Parsed header pairs, in declaration order.
    pub headers: Vec<(String, String)>,
    /// Present only for body-carrying methods.
    pub body: Option<String>,
}

/// A completed HTTP exchange.  Non-success statuses are responses, not
/// errors — the engine decides how to treat them.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP request capability.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Send the request; `Err` only for network-level failures.
    async fn send(&self, request: RequestSpec) -> Result<HttpResponse, ProviderError>;
}
