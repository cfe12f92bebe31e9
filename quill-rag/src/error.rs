//! Error types for retrieval operations.

use thiserror::Error;

/// Errors that can occur while indexing, searching, or persisting chunks.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// An embedding provider call failed (network, auth, quota).
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector-index operation failed.
    #[error("Index error during {operation}: {message}")]
    Index {
        /// The operation that failed (`add`, `search`, `rebuild`).
        operation: String,
        /// A description of the failure.
        message: String,
    },

    /// Reading or writing the persisted artifacts failed.
    #[error("Store error during {operation}: {message}")]
    Store {
        /// The operation that failed (`load`, `persist`, `clear`).
        operation: String,
        /// A description of the failure.
        message: String,
    },

    /// The document has no indexed chunks.
    #[error("No indexed chunks for document '{0}'")]
    NotFound(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
