//! Error types for channel send operations.

use inboxflow_conversation::Channel;
use std::fmt;

/// Errors from channel send operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The contact has no identifier for the channel.
    MissingRecipient { channel: Channel },
    /// No sender is configured for the channel.
    ChannelNotConfigured { channel: Channel },
    /// The request could not be sent.
    RequestFailed { reason: String },
    /// The provider returned a non-success status.
    Api { status: u16, message: String },
    /// The provider response could not be parsed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for the provider.
    Timeout,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRecipient { channel } => match channel {
                Channel::Whatsapp => write!(f, "no phone number on contact for whatsapp send"),
                Channel::Instagram => {
                    write!(f, "no instagram id on contact for instagram send")
                }
            },
            Self::ChannelNotConfigured { channel } => {
                write!(f, "no sender configured for channel {channel}")
            }
            Self::RequestFailed { reason } => write!(f, "channel send failed: {reason}"),
            Self::Api { status, message } => {
                write!(f, "channel API returned {status}: {message}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse channel response: {reason}")
            }
            Self::Timeout => write!(f, "channel send timed out"),
        }
    }
}

impl std::error::Error for SendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_recipient_names_the_identifier() {
        let err = SendError::MissingRecipient {
            channel: Channel::Whatsapp,
        };
        assert!(err.to_string().contains("phone number"));

        let err = SendError::MissingRecipient {
            channel: Channel::Instagram,
        };
        assert!(err.to_string().contains("instagram id"));
    }

    #[test]
    fn api_error_display() {
        let err = SendError::Api {
            status: 403,
            message: "token expired".to_string(),
        };
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("token expired"));
    }
}
