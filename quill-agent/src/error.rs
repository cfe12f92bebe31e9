//! Error types for query-resolution agents.

use thiserror::Error;

use quill_rag::RetrievalError;

/// Errors surfaced by the resolver, validator, and analyzer.
///
/// Validation problems are normally recovered into a
/// [`ValidationReport`](crate::ValidationReport) rather than raised; the
/// `Validation` variant exists for callers that want to escalate one.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The retrieval layer failed (embedding or index I/O).
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// A language-model call failed while producing an answer.
    #[error("Synthesis failed ({agent}): {message}")]
    Synthesis {
        /// The agent whose model call failed.
        agent: &'static str,
        /// A description of the failure.
        message: String,
    },

    /// The input was rejected before processing.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A convenience result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
