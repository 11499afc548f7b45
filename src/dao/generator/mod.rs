//! Seam between the game and the text generation backend.

/// OpenAI-compatible chat completion backend.
pub mod openai;

use futures::{future::BoxFuture, stream::BoxStream};
use thiserror::Error;

pub use openai::OpenAiGenerator;

/// Result alias for generation calls.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// One item of a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Incremental piece of text, forwarded to the player as-is.
    Fragment(String),
    /// Full text once the backend finished; always the last item.
    Completed(String),
}

/// Failures reported by a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Building the HTTP client failed.
    #[error("failed to build generator client")]
    ClientBuilder {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or the body could not be read.
    #[error("generator request failed")]
    Transport {
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("generator responded with status {status}: {body}")]
    Status {
        /// Status returned by the backend.
        status: reqwest::StatusCode,
        /// Response body, kept for the logs.
        body: String,
    },
    /// A payload could not be decoded.
    #[error("failed to decode generator payload")]
    Decode {
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// The backend returned no text at all.
    #[error("generator returned no content")]
    Empty,
}

/// Text generation backend.
pub trait TextGenerator: Send + Sync {
    /// Continue `input`, yielding fragments then a final [`GenerationEvent::Completed`].
    ///
    /// Dropping the stream cancels the upstream request.
    fn stream(&self, input: String) -> BoxStream<'static, GenerationResult<GenerationEvent>>;

    /// Run `prompt` to completion and return the whole text.
    fn complete(&self, prompt: String) -> BoxFuture<'static, GenerationResult<String>>;
}
