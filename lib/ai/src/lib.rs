//! AI reply generation for the inboxflow platform.
//!
//! This crate provides:
//!
//! - **Backend abstraction**: a [`ReplyBackend`] trait over completion
//!   providers, with request/response types and token accounting
//! - **Prompt assembly**: turning a conversation history and contact
//!   snapshot into an ordered message list with a system prompt
//! - **OpenAI-compatible client**: a concrete backend over HTTP

pub mod backend;
pub mod error;
pub mod openai;
pub mod prompt;

pub use backend::{
    MockReplyBackend, ReplyBackend, ReplyMessage, ReplyRequest, ReplyResponse, ReplyRole,
    TokenUsage,
};
pub use error::AiError;
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use prompt::{PromptAssembly, DEFAULT_SYSTEM_PROMPT};
