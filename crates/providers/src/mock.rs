//! Test doubles for the producer capabilities.
//!
//! Useful in unit and integration tests where a real Gemini key or network
//! access is either unavailable or irrelevant.  Both mocks record every
//! call they receive for assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use crate::{
    GenerationConfig, HttpResponse, ProviderError, RequestSender, RequestSpec, TextGenerator,
    TextStream,
};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Behaviour injected into [`MockGenerator`] at construction time.
#[derive(Clone)]
pub enum MockGeneration {
    /// Stream the given chunks, then end successfully.
    Chunks(Vec<String>),
    /// Stream the given chunks, then fail.
    FailAfter(Vec<String>, String),
    /// Fail before the first chunk.
    Fail(String),
}

/// A mock generator that records every prompt/config it receives and
/// replays a scripted chunk sequence.
pub struct MockGenerator {
    behaviour: MockGeneration,
    /// All (prompt, config) pairs seen, in call order.
    pub calls: Arc<Mutex<Vec<(String, GenerationConfig)>>>,
}

impl MockGenerator {
    /// Stream the given chunks and succeed.
    pub fn streaming<S: Into<String>>(chunks: impl IntoIterator<Item = S>) -> Self {
        Self {
            behaviour: MockGeneration::Chunks(chunks.into_iter().map(Into::into).collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail before producing any chunk.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behaviour: MockGeneration::Fail(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Stream some chunks, then fail.
    pub fn failing_after<S: Into<String>>(
        chunks: impl IntoIterator<Item = S>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            behaviour: MockGeneration::FailAfter(
                chunks.into_iter().map(Into::into).collect(),
                message.into(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this generator has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The prompt of the most recent call.
    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(p, _)| p.clone())
    }

    fn record(&self, prompt: &str, config: &GenerationConfig) {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_owned(), config.clone()));
    }

    fn items(&self) -> Vec<Result<String, ProviderError>> {
        match &self.behaviour {
            MockGeneration::Chunks(chunks) => chunks.iter().cloned().map(Ok).collect(),
            MockGeneration::FailAfter(chunks, message) => chunks
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(ProviderError::Api(message.clone()))))
                .collect(),
            MockGeneration::Fail(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        self.record(prompt, config);
        match &self.behaviour {
            MockGeneration::Chunks(chunks) => Ok(chunks.concat()),
            MockGeneration::FailAfter(_, message) | MockGeneration::Fail(message) => {
                Err(ProviderError::Api(message.clone()))
            }
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream, ProviderError> {
        self.record(prompt, config);
        if let MockGeneration::Fail(message) = &self.behaviour {
            return Err(ProviderError::Api(message.clone()));
        }
        Ok(futures::stream::iter(self.items()).boxed())
    }
}

// ---------------------------------------------------------------------------
// MockSender
// ---------------------------------------------------------------------------

/// Behaviour injected into [`MockSender`] at construction time.
#[derive(Clone)]
pub enum MockExchange {
    /// Return this response for every request.
    Respond(HttpResponse),
    /// Fail every request at the network level.
    Fail(String),
}

/// A mock request sender that records every [`RequestSpec`] it receives.
pub struct MockSender {
    behaviour: MockExchange,
    /// All requests seen, in call order.
    pub calls: Arc<Mutex<Vec<RequestSpec>>>,
}

impl MockSender {
    /// Always respond with the given response.
    pub fn responding(response: HttpResponse) -> Self {
        Self {
            behaviour: MockExchange::Respond(response),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always respond with the given status and body.
    pub fn with_status(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self::responding(HttpResponse {
            status,
            status_text: status_text.into(),
            body: body.into(),
        })
    }

    /// Always fail with a network-level error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behaviour: MockExchange::Fail(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of requests this sender has received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RequestSpec> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RequestSender for MockSender {
    async fn send(&self, request: RequestSpec) -> Result<HttpResponse, ProviderError> {
        self.calls.lock().unwrap().push(request);
        match &self.behaviour {
            MockExchange::Respond(response) => Ok(response.clone()),
            MockExchange::Fail(message) => Err(ProviderError::Network(message.clone())),
        }
    }
}
