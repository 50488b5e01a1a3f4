//! Provider-level error type.

use thiserror::Error;

/// Errors returned by producer capabilities.
///
/// String payloads keep the type `Clone`-able and mockable; the engine only
/// ever renders these as human-readable text in a derived node.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    /// The upstream API rejected the call or returned an error payload.
    #[error("{0}")]
    Api(String),

    /// Transport-level failure (DNS, connect, TLS, read).
    #[error("network error: {0}")]
    Network(String),

    /// The capability is not configured (e.g. missing API key).
    #[error("{0}")]
    NotConfigured(String),

    /// The request descriptor itself is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
