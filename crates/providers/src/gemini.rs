//! Gemini-backed [`TextGenerator`] over the Generative Language REST API.
//!
//! Non-streaming calls hit `:generateContent`; streaming calls hit
//! `:streamGenerateContent?alt=sse` and yield one chunk per SSE data line.
//! Both paths build the identical request body, so config semantics match.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::warn;

use crate::{GenerationConfig, ProviderError, TextGenerator, TextStream};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Text generation via the Gemini API.
///
/// A missing API key is tolerated at construction time (flows without LLM
/// nodes must still load); the error surfaces when a generation is
/// actually attempted.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Read the API key from [`API_KEY_ENV`].
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok();
        if api_key.is_none() {
            warn!("{API_KEY_ENV} is not set; LLM nodes will fail until it is");
        }
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Gemini API not initialized. Please set the {API_KEY_ENV} environment variable."
            ))
        })
    }

    fn request_body(&self, prompt: &str, config: &GenerationConfig) -> Value {
        let mut generation_config = json!({});
        if let Some(temperature) = config.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if config.thinking_enabled == Some(false) {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": 0 });
        }
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        })
    }

    async fn post(
        &self,
        endpoint: &str,
        query: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key()?;
        let url = format!(
            "{API_BASE}/models/{model}:{endpoint}?{query}key={key}",
            model = self.model
        );
        let response = self
            .client
            .post(url)
            .json(&self.request_body(prompt, config))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "Gemini API Error: {status}: {body}"
            )));
        }
        Ok(response)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    Some(text)
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let response = self.post("generateContent", "", prompt, config).await?;
        let payload: Value = response.json().await?;
        extract_text(&payload)
            .ok_or_else(|| ProviderError::Api("Gemini response contained no text".to_owned()))
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream, ProviderError> {
        let response = self
            .post("streamGenerateContent", "alt=sse&", prompt, config)
            .await?;

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(ProviderError::from)?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited; keep the trailing
                // partial line in the buffer until more bytes arrive.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_owned();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let payload: Value = serde_json::from_str(data).map_err(|e| {
                        ProviderError::Api(format!("malformed Gemini stream event: {e}"))
                    })?;
                    if let Some(text) = extract_text(&payload) {
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
