//! Error types for chat-model capabilities.

use thiserror::Error;

/// Errors produced by a [`ChatModel`](crate::ChatModel) implementation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be sent or timed out.
    #[error("Model request failed ({model}): {message}")]
    Request {
        /// The model the request was addressed to.
        model: String,
        /// A description of the transport failure.
        message: String,
    },

    /// The API answered, but with an error status or an unusable body.
    #[error("Model returned an unusable response ({model}): {message}")]
    Response {
        /// The model that produced the response.
        model: String,
        /// A description of what was wrong with it.
        message: String,
    },

    /// The client was misconfigured (missing key, bad URL, ...).
    #[error("Model configuration error: {0}")]
    Config(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
