//! Trigger specifications for workflows.
//!
//! A workflow's trigger decides which inbound message events start a run.
//! The trigger spec lives on the workflow document, separate from the
//! trigger node inside the graph, which only anchors traversal.

use serde::{Deserialize, Serialize};

/// The kind of event that starts a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Fires on every inbound message.
    NewMessage,
    /// Fires when the inbound message contains one of the configured
    /// keywords.
    KeywordMatch,
}

/// A workflow trigger specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// The kind of event this trigger fires on.
    pub trigger_type: TriggerType,
    /// Keywords for [`TriggerType::KeywordMatch`]; ignored otherwise.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TriggerSpec {
    /// A trigger that fires on every inbound message.
    #[must_use]
    pub fn new_message() -> Self {
        Self {
            trigger_type: TriggerType::NewMessage,
            keywords: Vec::new(),
        }
    }

    /// A trigger that fires when the message contains one of `keywords`.
    #[must_use]
    pub fn keyword_match(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            trigger_type: TriggerType::KeywordMatch,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if an inbound message with `content` fires this
    /// trigger.
    ///
    /// Keyword matching is a case-insensitive substring test. A keyword
    /// trigger with an empty keyword list never fires.
    #[must_use]
    pub fn matches(&self, content: &str) -> bool {
        match self.trigger_type {
            TriggerType::NewMessage => true,
            TriggerType::KeywordMatch => {
                let content = content.to_lowercase();
                self.keywords
                    .iter()
                    .any(|keyword| !keyword.is_empty() && content.contains(&keyword.to_lowercase()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_matches_anything() {
        let spec = TriggerSpec::new_message();
        assert!(spec.matches("hello"));
        assert!(spec.matches(""));
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let spec = TriggerSpec::keyword_match(["price"]);
        assert!(spec.matches("what is the PRICE of this?"));
        assert!(spec.matches("pricing question"));
        assert!(!spec.matches("hello"));
    }

    #[test]
    fn keyword_match_with_no_keywords_never_fires() {
        let spec = TriggerSpec::keyword_match(Vec::<String>::new());
        assert!(!spec.matches("anything at all"));
    }

    #[test]
    fn trigger_spec_serde() {
        let spec = TriggerSpec::keyword_match(["price", "cost"]);
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["trigger_type"], "keyword_match");

        let parsed: TriggerSpec =
            serde_json::from_str(r#"{"trigger_type": "new_message"}"#).expect("deserialize");
        assert_eq!(parsed, TriggerSpec::new_message());
    }
}
