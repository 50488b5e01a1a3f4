//! `providers` crate — the producer capability traits and their
//! implementations.
//!
//! The engine dispatches external calls through [`TextGenerator`] and
//! [`RequestSender`] trait objects; real providers ([`GeminiGenerator`],
//! [`ReqwestSender`]) and test mocks all implement the same contracts.

pub mod error;
pub mod gemini;
pub mod http;
pub mod mock;
pub mod traits;

pub use error::ProviderError;
pub use gemini::GeminiGenerator;
pub use http::ReqwestSender;
pub use traits::{
    GenerationConfig, HttpResponse, RequestSender, RequestSpec, TextGenerator, TextStream,
};
