//! Execution context carried through a workflow run.

use chrono::{DateTime, Utc};
use inboxflow_conversation::{Channel, ContactSnapshot};
use inboxflow_core::{ContactId, ConversationId, MessageId, TenantId};
use serde::{Deserialize, Serialize};

/// An inbound message event, as delivered by a channel webhook.
///
/// This is the engine's sole entry point: every workflow run starts from
/// one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The tenant the message belongs to.
    pub tenant_id: TenantId,
    /// The conversation the message arrived in.
    pub conversation_id: ConversationId,
    /// The inbound message ID.
    pub message_id: MessageId,
    /// The contact who sent the message.
    pub contact_id: ContactId,
    /// The channel the message arrived on.
    pub channel: Channel,
    /// The message text.
    pub content: String,
    /// Snapshot of the contact at the moment the message arrived.
    pub contact: ContactSnapshot,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

/// Mutable state threaded through a single workflow run.
///
/// Each run gets its own context cloned from the triggering event, so
/// concurrent runs for the same message never observe each other's
/// mutations.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The tenant the run belongs to.
    pub tenant_id: TenantId,
    /// The conversation the run acts on.
    pub conversation_id: ConversationId,
    /// The message that triggered the run.
    pub message_id: MessageId,
    /// The contact who sent the triggering message.
    pub contact_id: ContactId,
    /// The channel replies go out on.
    pub channel: Channel,
    /// The triggering message text.
    pub message_content: String,
    /// Contact snapshot, updated in place as action nodes mutate the
    /// contact.
    pub contact: ContactSnapshot,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Builds a run context from an inbound message event.
    #[must_use]
    pub fn from_event(event: &InboundMessage) -> Self {
        Self {
            tenant_id: event.tenant_id,
            conversation_id: event.conversation_id,
            message_id: event.message_id,
            contact_id: event.contact_id,
            channel: event.channel,
            message_content: event.content.clone(),
            contact: event.contact.clone(),
            started_at: Utc::now(),
        }
    }

    /// Records a tag on the local contact snapshot so later condition
    /// nodes in the same run observe it.
    pub fn add_contact_tag(&mut self, tag: &str) {
        if !self.contact.has_tag(tag) {
            self.contact.tags.push(tag.to_string());
        }
    }
}
