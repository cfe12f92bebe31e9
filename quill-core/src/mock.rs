//! Scripted chat model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::model::{ChatModel, GenerationConfig};

/// A recorded `generate` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub config: GenerationConfig,
}

/// A [`ChatModel`] that replays scripted responses.
///
/// Responses queued with [`with_response`](MockChat::with_response) are
/// returned in order; once the queue is empty the fallback response is
/// returned indefinitely. Every call is recorded for later assertions.
///
/// # Example
///
/// ```rust,ignore
/// let model = MockChat::new().with_response("first").with_response("second");
/// assert_eq!(model.generate("s", "u", &config).await?, "first");
/// assert_eq!(model.calls().len(), 1);
/// ```
pub struct MockChat {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    failure: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChat {
    /// Create a mock that answers `"mock response"` to everything.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: "mock response".to_string(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response to be returned by the next unanswered call.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().expect("mock lock poisoned").push_back(response.into());
        self
    }

    /// Set the response returned once the queue is exhausted.
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = response.into();
        self
    }

    /// Make every call fail with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::new() }
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        self.calls.lock().expect("mock lock poisoned").push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            config: *config,
        });

        if let Some(message) = &self.failure {
            return Err(ModelError::Request {
                model: self.name().to_string(),
                message: message.clone(),
            });
        }

        let queued = self.responses.lock().expect("mock lock poisoned").pop_front();
        Ok(queued.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_responses_then_fallback() {
        let model = MockChat::new().with_response("one").with_response("two");
        let config = GenerationConfig::default();

        assert_eq!(model.generate("s", "a", &config).await.unwrap(), "one");
        assert_eq!(model.generate("s", "b", &config).await.unwrap(), "two");
        assert_eq!(model.generate("s", "c", &config).await.unwrap(), "mock response");
        assert_eq!(model.calls().len(), 3);
        assert_eq!(model.calls()[1].user_prompt, "b");
    }

    #[tokio::test]
    async fn failing_mock_errors_every_call() {
        let model = MockChat::failing("quota exceeded");
        let err = model.generate("s", "u", &GenerationConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
