//! Error types for the AI crate.

use std::fmt;

/// Errors from reply generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// No API credentials configured for the backend.
    MissingCredentials,
    /// The upstream provider returned a non-success status.
    Upstream { status: u16, message: String },
    /// The request could not be sent.
    RequestFailed { reason: String },
    /// The provider response could not be parsed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for the provider.
    Timeout,
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => write!(f, "no AI credentials configured"),
            Self::Upstream { status, message } => {
                write!(f, "AI provider returned {status}: {message}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "AI request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse AI response: {reason}")
            }
            Self::Timeout => write!(f, "AI request timed out"),
        }
    }
}

impl std::error::Error for AiError {}
