//! OpenAI-compatible chat completion backend.

use crate::backend::{ReplyBackend, ReplyRequest, ReplyResponse, TokenUsage};
use crate::error::AiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key. A missing key fails every request with a structured error
    /// rather than sending unauthenticated calls upstream.
    pub api_key: Option<String>,
}

/// A reply backend speaking the OpenAI chat completions protocol.
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiBackend {
    /// Creates a backend with the given configuration.
    #[must_use]
    pub fn new(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [crate::backend::ReplyMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: CompletionUsage,
    model: String,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl ReplyBackend for OpenAiBackend {
    async fn generate(&self, request: &ReplyRequest) -> Result<ReplyResponse, AiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AiError::MissingCredentials)?;

        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| AiError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::ResponseParseFailed {
                reason: "response contained no choices".to_string(),
            })?;

        Ok(ReplyResponse {
            reply,
            usage: TokenUsage {
                input_tokens: completion.usage.prompt_tokens,
                output_tokens: completion.usage.completion_tokens,
            },
            model: completion.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReplyMessage;

    #[tokio::test]
    async fn missing_api_key_fails_without_network_call() {
        let backend = OpenAiBackend::new(
            OpenAiConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
            },
            reqwest::Client::new(),
        );

        let request = ReplyRequest::new(vec![ReplyMessage::user("hi")]);
        let result = backend.generate(&request).await;
        assert_eq!(result, Err(AiError::MissingCredentials));
    }

    #[test]
    fn completion_response_parses_usage() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5},
            "model": "gpt-4o-mini"
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.choices[0].message.content, "hello");
        assert_eq!(parsed.usage.prompt_tokens, 12);
    }
}
