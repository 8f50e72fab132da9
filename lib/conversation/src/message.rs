//! Message types for conversations.

use chrono::{DateTime, Utc};
use inboxflow_core::{ConversationId, MessageId, TenantId, WorkflowId};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// The contact (end user) on the channel.
    Contact,
    /// A human agent in the inbox.
    Agent,
    /// An AI-generated reply from a workflow.
    Bot,
    /// A fixed template body sent by a workflow.
    Template,
}

/// A persisted message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// The tenant that owns the conversation.
    pub tenant_id: TenantId,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Message sender type.
    pub sender: MessageSender,
    /// Message body.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// The workflow that produced this message, for bot/template sends.
    pub workflow_id: Option<WorkflowId>,
    /// Token usage for AI-generated replies.
    pub tokens_used: Option<u32>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        conversation_id: ConversationId,
        sender: MessageSender,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            tenant_id,
            conversation_id,
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            workflow_id: None,
            tokens_used: None,
        }
    }

    /// Creates an AI-generated reply, tagged with the producing workflow.
    #[must_use]
    pub fn bot_reply(
        tenant_id: TenantId,
        conversation_id: ConversationId,
        content: impl Into<String>,
        workflow_id: WorkflowId,
        tokens_used: Option<u32>,
    ) -> Self {
        let mut message = Self::new(tenant_id, conversation_id, MessageSender::Bot, content);
        message.workflow_id = Some(workflow_id);
        message.tokens_used = tokens_used;
        message
    }

    /// Creates a template message, tagged with the producing workflow.
    #[must_use]
    pub fn template(
        tenant_id: TenantId,
        conversation_id: ConversationId,
        content: impl Into<String>,
        workflow_id: WorkflowId,
    ) -> Self {
        let mut message = Self::new(tenant_id, conversation_id, MessageSender::Template, content);
        message.workflow_id = Some(workflow_id);
        message
    }
}

/// A single entry in the trailing conversation history window.
///
/// This is the denormalized shape delivered by the webhook entry point;
/// timestamps are optional because some providers omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who sent the message.
    pub sender: MessageSender,
    /// Message body.
    pub content: String,
    /// When the message was sent, if known.
    pub timestamp: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Creates a history entry from the contact.
    #[must_use]
    pub fn contact(content: impl Into<String>) -> Self {
        Self {
            sender: MessageSender::Contact,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Creates a history entry from the bot.
    #[must_use]
    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: MessageSender::Bot,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// A bounded trailing window of conversation history, most-recent-last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl ConversationHistory {
    /// Default window size for AI reply context.
    pub const DEFAULT_CAPACITY: usize = 20;

    /// Creates an empty history with the default window size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty history with the given window size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Creates a history from existing entries, trimming to the window.
    #[must_use]
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Appends an entry, evicting the oldest when the window is full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    /// Returns the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns true if the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_reply_carries_workflow_metadata() {
        let tenant_id = TenantId::new();
        let conversation_id = ConversationId::new();
        let workflow_id = WorkflowId::new();

        let message = Message::bot_reply(
            tenant_id,
            conversation_id,
            "Thanks for reaching out!",
            workflow_id,
            Some(184),
        );

        assert_eq!(message.sender, MessageSender::Bot);
        assert_eq!(message.workflow_id, Some(workflow_id));
        assert_eq!(message.tokens_used, Some(184));
    }

    #[test]
    fn template_message_sender_type() {
        let message = Message::template(
            TenantId::new(),
            ConversationId::new(),
            "Our store hours are 9-18.",
            WorkflowId::new(),
        );
        assert_eq!(message.sender, MessageSender::Template);
        assert!(message.tokens_used.is_none());
    }

    #[test]
    fn history_window_evicts_oldest() {
        let mut history = ConversationHistory::with_capacity(3);
        for i in 0..5 {
            history.push(HistoryEntry::contact(format!("message {i}")));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[0].content, "message 2");
        assert_eq!(history.entries()[2].content, "message 4");
    }

    #[test]
    fn from_entries_trims_to_window() {
        let entries: Vec<_> = (0..30)
            .map(|i| HistoryEntry::contact(format!("m{i}")))
            .collect();
        let history = ConversationHistory::from_entries(entries);

        assert_eq!(history.len(), ConversationHistory::DEFAULT_CAPACITY);
        assert_eq!(history.entries().last().unwrap().content, "m29");
    }

    #[test]
    fn message_serde_roundtrip() {
        let message = Message::new(
            TenantId::new(),
            ConversationId::new(),
            MessageSender::Contact,
            "hello",
        );
        let json = serde_json::to_string(&message).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(message, parsed);
    }
}
