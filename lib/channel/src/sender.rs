//! Channel sender trait and related types.

use crate::error::SendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The result of a successful channel send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider-assigned message identifier, when the API returns one.
    pub message_id: Option<String>,
}

/// Trait for platform send adapters.
///
/// Implementations must convert provider failures into [`SendError`]
/// values rather than panicking; the recipient identifier is resolved by
/// the caller before this trait is reached.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Sends a text message to the given recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt, SendError>;
}

/// A recorded outbound send, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    /// The recipient identifier.
    pub recipient: String,
    /// The message body.
    pub body: String,
}

/// A sender that records sends in memory instead of calling a provider.
#[derive(Clone)]
pub struct RecordingSender {
    sends: Arc<Mutex<Vec<RecordedSend>>>,
    fail_with: Option<SendError>,
}

impl RecordingSender {
    /// Creates a sender that succeeds and records every send.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sends: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// Creates a sender that fails every send with the given error.
    #[must_use]
    pub fn failing(error: SendError) -> Self {
        Self {
            sends: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(error),
        }
    }

    /// Returns the sends recorded so far.
    #[must_use]
    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().unwrap().clone()
    }
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt, SendError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.sends.lock().unwrap().push(RecordedSend {
            recipient: recipient.to_string(),
            body: body.to_string(),
        });
        Ok(SendReceipt {
            message_id: Some(format!("rec_{}", self.sends.lock().unwrap().len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_sender_captures_sends() {
        let sender = RecordingSender::new();
        sender
            .send_text("+15550001111", "hello")
            .await
            .expect("should succeed");

        let sends = sender.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].recipient, "+15550001111");
        assert_eq!(sends[0].body, "hello");
    }

    #[tokio::test]
    async fn failing_sender_returns_configured_error() {
        let sender = RecordingSender::failing(SendError::Timeout);
        let result = sender.send_text("+15550001111", "hello").await;
        assert_eq!(result, Err(SendError::Timeout));
        assert!(sender.sends().is_empty());
    }
}
