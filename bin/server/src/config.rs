//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables with `__` as the nesting separator, e.g.
//! `ENGINE__MAX_STEPS=25` or `WHATSAPP__ACCESS_TOKEN=...`.

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Engine limits.
    #[serde(default)]
    pub engine: EngineSettings,

    /// OpenAI-compatible completion backend.
    #[serde(default)]
    pub openai: OpenAiSettings,

    /// WhatsApp Cloud API credentials. Absent means WhatsApp sends are
    /// not configured.
    #[serde(default)]
    pub whatsapp: Option<WhatsAppSettings>,

    /// Instagram Messaging API credentials. Absent means Instagram
    /// sends are not configured.
    #[serde(default)]
    pub instagram: Option<InstagramSettings>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Engine run limits.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Maximum nodes a single run may execute.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Wall-clock budget for a single node, in seconds.
    #[serde(default = "default_node_timeout_seconds")]
    pub node_timeout_seconds: u64,
}

fn default_max_steps() -> u32 {
    50
}

fn default_node_timeout_seconds() -> u64 {
    30
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            node_timeout_seconds: default_node_timeout_seconds(),
        }
    }
}

/// OpenAI completion backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    /// Base URL for the completions API.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key. Absent keys fail AI reply nodes at execution time, not
    /// at startup.
    pub api_key: Option<String>,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key: None,
        }
    }
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppSettings {
    /// Graph API base URL.
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
    /// The business phone number id sends go out through.
    pub phone_number_id: String,
    /// Access token.
    pub access_token: String,
}

/// Instagram Messaging API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramSettings {
    /// Graph API base URL.
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
    /// Access token.
    pub access_token: String,
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_settings_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_steps, 50);
        assert_eq!(settings.node_timeout_seconds, 30);
    }

    #[test]
    fn openai_settings_defaults() {
        let settings = OpenAiSettings::default();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert!(settings.api_key.is_none());
    }
}
