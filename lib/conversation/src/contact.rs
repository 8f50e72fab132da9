//! Contact snapshot carried through workflow execution.
//!
//! The engine never loads full contact documents; the webhook entry point
//! denormalizes the fields the node handlers need at trigger time.

use crate::channel::Channel;
use serde::{Deserialize, Serialize};

/// A denormalized view of a contact at the moment a workflow triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    /// Display name of the contact.
    pub name: String,
    /// Phone number, present for WhatsApp contacts.
    pub phone: Option<String>,
    /// Instagram-scoped user ID, present for Instagram contacts.
    pub instagram_id: Option<String>,
    /// Tags currently applied to the contact.
    pub tags: Vec<String>,
}

impl ContactSnapshot {
    /// Creates a snapshot with just a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            instagram_id: None,
            tags: Vec::new(),
        }
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the Instagram-scoped user ID.
    #[must_use]
    pub fn with_instagram_id(mut self, instagram_id: impl Into<String>) -> Self {
        self.instagram_id = Some(instagram_id.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Returns true if the contact carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns the recipient identifier for the given channel, if present.
    ///
    /// WhatsApp sends require a phone number; Instagram sends require the
    /// channel-scoped user ID.
    #[must_use]
    pub fn recipient_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Whatsapp => self.phone.as_deref(),
            Channel::Instagram => self.instagram_id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_builder() {
        let contact = ContactSnapshot::new("Maria Silva")
            .with_phone("+5511999990000")
            .with_tag("vip");

        assert_eq!(contact.name, "Maria Silva");
        assert_eq!(contact.phone.as_deref(), Some("+5511999990000"));
        assert!(contact.has_tag("vip"));
        assert!(!contact.has_tag("spam"));
    }

    #[test]
    fn recipient_for_whatsapp_is_phone() {
        let contact = ContactSnapshot::new("Maria").with_phone("+15550001111");
        assert_eq!(
            contact.recipient_for(Channel::Whatsapp),
            Some("+15550001111")
        );
        assert_eq!(contact.recipient_for(Channel::Instagram), None);
    }

    #[test]
    fn recipient_for_instagram_is_scoped_id() {
        let contact = ContactSnapshot::new("Maria").with_instagram_id("1784000123");
        assert_eq!(contact.recipient_for(Channel::Instagram), Some("1784000123"));
        assert_eq!(contact.recipient_for(Channel::Whatsapp), None);
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let contact = ContactSnapshot::new("Maria").with_tag("lead").with_tag("pt-br");
        let json = serde_json::to_string(&contact).expect("serialize");
        let parsed: ContactSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(contact, parsed);
    }
}
