//! Per-channel dispatch.
//!
//! The router owns one sender per channel and resolves the recipient
//! identifier from the contact snapshot before any network call is made.

use crate::error::SendError;
use crate::sender::{ChannelSender, SendReceipt};
use inboxflow_conversation::{Channel, ContactSnapshot};
use std::sync::Arc;

/// Routes sends to the channel-appropriate sender.
#[derive(Clone, Default)]
pub struct ChannelRouter {
    whatsapp: Option<Arc<dyn ChannelSender>>,
    instagram: Option<Arc<dyn ChannelSender>>,
}

impl ChannelRouter {
    /// Creates an empty router with no channels configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WhatsApp sender.
    #[must_use]
    pub fn with_whatsapp(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.whatsapp = Some(sender);
        self
    }

    /// Sets the Instagram sender.
    #[must_use]
    pub fn with_instagram(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.instagram = Some(sender);
        self
    }

    /// Sends a text message to the contact on the given channel.
    ///
    /// Recipient resolution happens first: a contact without the
    /// channel-appropriate identifier fails before any provider call.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient is missing, the channel has no
    /// configured sender, or the provider call fails.
    pub async fn send_text(
        &self,
        channel: Channel,
        contact: &ContactSnapshot,
        body: &str,
    ) -> Result<SendReceipt, SendError> {
        let recipient = contact
            .recipient_for(channel)
            .ok_or(SendError::MissingRecipient { channel })?;

        let sender = match channel {
            Channel::Whatsapp => self.whatsapp.as_ref(),
            Channel::Instagram => self.instagram.as_ref(),
        }
        .ok_or(SendError::ChannelNotConfigured { channel })?;

        sender.send_text(recipient, body).await
    }
}
