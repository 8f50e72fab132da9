//! Reply backend abstraction.
//!
//! Provides a unified interface over completion providers. The workflow
//! engine only ever sees this trait; concrete providers live behind it.

use crate::error::AiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The role of a message in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyRole {
    /// System instruction.
    System,
    /// The contact's side of the conversation.
    User,
    /// The bot's side of the conversation.
    Assistant,
}

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// The role of the message sender.
    pub role: ReplyRole,
    /// The content of the message.
    pub content: String,
}

impl ReplyMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ReplyRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ReplyRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ReplyRole::Assistant,
            content: content.into(),
        }
    }
}

/// A request to generate a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRequest {
    /// Ordered message list, system prompt first, inbound message last.
    pub messages: Vec<ReplyMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl ReplyRequest {
    /// Creates a request from an ordered message list.
    #[must_use]
    pub fn new(messages: Vec<ReplyMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens.
    pub input_tokens: u32,
    /// Number of output tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns the total number of tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A generated reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyResponse {
    /// The generated reply text.
    pub reply: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the reply.
    pub model: String,
}

/// Trait for reply backends.
///
/// Implementations must convert provider failures (missing credentials,
/// non-2xx responses, malformed bodies) into [`AiError`] values rather
/// than panicking.
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Generates a reply for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion call fails.
    async fn generate(&self, request: &ReplyRequest) -> Result<ReplyResponse, AiError>;
}

/// A mock backend that can be configured to succeed or fail.
///
/// Every request is recorded so tests can assert on the assembled
/// prompt.
pub struct MockReplyBackend {
    /// If set, all generations fail with this error.
    pub fail_with: Option<AiError>,
    /// The reply to return on success.
    pub reply: String,
    /// Token usage to report on success.
    pub usage: TokenUsage,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl MockReplyBackend {
    /// Creates a mock backend that succeeds with the given reply.
    #[must_use]
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            fail_with: None,
            reply: reply.into(),
            usage: TokenUsage {
                input_tokens: 120,
                output_tokens: 40,
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock backend that fails with the given error.
    #[must_use]
    pub fn failing(error: AiError) -> Self {
        Self {
            fail_with: Some(error),
            reply: String::new(),
            usage: TokenUsage::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the requests seen so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReplyBackend for MockReplyBackend {
    async fn generate(&self, request: &ReplyRequest) -> Result<ReplyResponse, AiError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(ReplyResponse {
                reply: self.reply.clone(),
                usage: self.usage,
                model: "mock".to_string(),
            }),
        }
    }
}
