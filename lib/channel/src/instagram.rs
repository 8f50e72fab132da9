//! Instagram Messaging API sender.

use crate::error::SendError;
use crate::sender::{ChannelSender, SendReceipt};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Configuration for the Instagram Messaging API.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramConfig {
    /// Graph API base URL (e.g. `https://graph.facebook.com/v19.0`).
    pub base_url: String,
    /// Access token for the connected Instagram professional account.
    pub access_token: String,
}

/// A sender speaking the Instagram messages API.
pub struct InstagramSender {
    config: InstagramConfig,
    client: reqwest::Client,
}

impl InstagramSender {
    /// Creates a sender with the given configuration.
    #[must_use]
    pub fn new(config: InstagramConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[derive(Deserialize)]
struct InstagramResponse {
    #[serde(default)]
    message_id: Option<String>,
}

#[async_trait]
impl ChannelSender for InstagramSender {
    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt, SendError> {
        let url = format!("{}/me/messages", self.config.base_url);
        let payload = json!({
            "recipient": { "id": recipient },
            "message": { "text": body },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout
                } else {
                    SendError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: InstagramResponse =
            response
                .json()
                .await
                .map_err(|e| SendError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        Ok(SendReceipt {
            message_id: parsed.message_id,
        })
    }
}
