//! Channel send adapters for the inboxflow platform.
//!
//! Each messaging platform gets a [`ChannelSender`] implementation; the
//! [`ChannelRouter`] picks the right one for a conversation's channel and
//! resolves the recipient identifier from the contact snapshot.

pub mod error;
pub mod instagram;
pub mod router;
pub mod sender;
pub mod whatsapp;

pub use error::SendError;
pub use instagram::{InstagramConfig, InstagramSender};
pub use router::ChannelRouter;
pub use sender::{ChannelSender, RecordingSender, SendReceipt};
pub use whatsapp::{WhatsAppConfig, WhatsAppSender};
