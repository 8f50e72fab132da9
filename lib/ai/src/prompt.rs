//! Prompt assembly for AI replies.
//!
//! Turns the trailing conversation window and the contact snapshot into
//! the ordered message list a backend expects: system prompt first, then
//! history oldest-to-newest, then the inbound message.

use crate::backend::{ReplyMessage, ReplyRequest};
use inboxflow_conversation::{ContactSnapshot, ConversationHistory, MessageSender};

/// Default system prompt applied when neither the node nor the workflow
/// configures one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful customer support assistant. \
Reply concisely in the language the customer is writing in.";

/// Assembles completion requests from conversation state.
#[derive(Debug, Clone)]
pub struct PromptAssembly {
    system_prompt: String,
}

impl PromptAssembly {
    /// Creates an assembly with the given system prompt, falling back to
    /// [`DEFAULT_SYSTEM_PROMPT`] when none is provided.
    #[must_use]
    pub fn new(system_prompt: Option<&str>) -> Self {
        Self {
            system_prompt: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
        }
    }

    /// Builds a completion request for an inbound message.
    ///
    /// The contact's name and tags are appended to the system prompt so the
    /// model can personalize the reply.
    #[must_use]
    pub fn build_request(
        &self,
        contact: &ContactSnapshot,
        history: &ConversationHistory,
        inbound: &str,
    ) -> ReplyRequest {
        let mut system = self.system_prompt.clone();
        system.push_str(&format!("\n\nCustomer name: {}.", contact.name));
        if !contact.tags.is_empty() {
            system.push_str(&format!(" Customer tags: {}.", contact.tags.join(", ")));
        }

        let mut messages = vec![ReplyMessage::system(system)];
        for entry in history.entries() {
            let message = match entry.sender {
                MessageSender::Contact => ReplyMessage::user(&entry.content),
                MessageSender::Agent | MessageSender::Bot | MessageSender::Template => {
                    ReplyMessage::assistant(&entry.content)
                }
            };
            messages.push(message);
        }
        messages.push(ReplyMessage::user(inbound));

        ReplyRequest::new(messages)
    }
}
