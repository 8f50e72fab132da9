//! WhatsApp Business Cloud API sender.

use crate::error::SendError;
use crate::sender::{ChannelSender, SendReceipt};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Configuration for the WhatsApp Cloud API.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API base URL (e.g. `https://graph.facebook.com/v19.0`).
    pub base_url: String,
    /// The business phone number ID messages are sent from.
    pub phone_number_id: String,
    /// Access token for the Graph API.
    pub access_token: String,
}

/// A sender speaking the WhatsApp Cloud messages API.
pub struct WhatsAppSender {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppSender {
    /// Creates a sender with the given configuration.
    #[must_use]
    pub fn new(config: WhatsAppConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[derive(Deserialize)]
struct WhatsAppResponse {
    #[serde(default)]
    messages: Vec<WhatsAppMessageId>,
}

#[derive(Deserialize)]
struct WhatsAppMessageId {
    id: String,
}

#[async_trait]
impl ChannelSender for WhatsAppSender {
    async fn send_text(&self, recipient: &str, body: &str) -> Result<SendReceipt, SendError> {
        let url = format!(
            "{}/{}/messages",
            self.config.base_url, self.config.phone_number_id
        );
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "body": body },
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

        let parsed: WhatsAppResponse =
            response
                .json()
                .await
                .map_err(|e| SendError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        Ok(SendReceipt {
            message_id: parsed.messages.into_iter().next().map(|m| m.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_message_id() {
        let json = r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.ABC"}]}"#;
        let parsed: WhatsAppResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.messages[0].id, "wamid.ABC");
    }

    #[test]
    fn response_tolerates_missing_messages() {
        let parsed: WhatsAppResponse = serde_json::from_str("{}").expect("deserialize");
        assert!(parsed.messages.is_empty());
    }
}
