//! # quill-core
//!
//! Shared contracts for the quill transcript question-answering engine.
//!
//! The central seam is [`ChatModel`], the chat-style language-model
//! capability consumed by the resolver, validator, and analyzer in
//! `quill-agent`. Concrete clients live in `quill-model`; [`MockChat`]
//! provides a scripted stand-in for tests.

pub mod error;
pub mod mock;
pub mod model;

pub use error::{ModelError, Result};
pub use mock::MockChat;
pub use model::{ChatModel, GenerationConfig};
