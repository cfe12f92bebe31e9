//! # quill-model
//!
//! Chat-model clients implementing [`quill_core::ChatModel`].
//!
//! Currently provides [`OpenAiChat`], which talks to the OpenAI
//! chat-completions API or any OpenAI-compatible server (Ollama, vLLM, ...)
//! via a configurable base URL.
//!
//! ```rust,no_run
//! use quill_model::OpenAiChat;
//!
//! let model = OpenAiChat::from_env().unwrap().with_model("gpt-4o-mini");
//! ```

pub mod openai;

pub use openai::OpenAiChat;
