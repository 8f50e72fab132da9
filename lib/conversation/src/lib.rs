//! Conversation domain types for the inboxflow platform.
//!
//! This crate provides the channel, contact, and message types shared by
//! the inbox, the webhook entry points, and the workflow engine.

pub mod channel;
pub mod contact;
pub mod message;
pub mod status;

pub use channel::Channel;
pub use contact::ContactSnapshot;
pub use message::{ConversationHistory, HistoryEntry, Message, MessageSender};
pub use status::ConversationStatus;
