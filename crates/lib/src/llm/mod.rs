//! Completion backend abstraction and OpenAI client.
//!
//! The router talks to [`CompletionBackend`] so tests can substitute a mock;
//! the real implementation is [`OpenAiClient`] against /v1/chat/completions.

mod openai;

pub use openai::{CompletionBackend, CompletionError, OpenAiClient};
