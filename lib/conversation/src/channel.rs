//! Messaging channels supported by the platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The messaging platform a conversation is occurring on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// WhatsApp Business messaging.
    Whatsapp,
    /// Instagram direct messaging.
    Instagram,
}

impl Channel {
    /// Returns the canonical wire name of the channel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
