//! The chat-model capability trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of tokens the model may produce.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationConfig {
    /// Create a config with explicit parameters.
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self { max_tokens, temperature }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_tokens: 1000, temperature: 0.3 }
    }
}

/// A chat-style language model.
///
/// Implementations wrap a specific backend behind a single blocking-style
/// call: one system prompt, one user prompt, one final text answer. The
/// callers in `quill-agent` never stream; each resolution or analysis step
/// consumes exactly one completed response.
///
/// # Example
///
/// ```rust,ignore
/// use quill_core::{ChatModel, GenerationConfig};
///
/// let answer = model
///     .generate("You are a helpful assistant.", "Say hi.", &GenerationConfig::default())
///     .await?;
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, for logs and error messages.
    fn name(&self) -> &str;

    /// Generate a single completion for the given prompts.
    ///
    /// Returns the model's final text with surrounding whitespace trimmed.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String>;
}
