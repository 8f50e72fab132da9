//! Workflow node types and configurations.
//!
//! Nodes are the building blocks of workflows. Each node has:
//! - A unique ID within the workflow
//! - A human-readable label
//! - Configuration specific to its kind
//! - A canvas position, kept only for round-tripping to the builder UI

use inboxflow_conversation::ConversationStatus;
use inboxflow_core::{AgentId, NodeId};
use serde::{Deserialize, Serialize};

/// The kind of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Entry point that anchors graph traversal.
    Trigger,
    /// Predicate against the execution context.
    Condition,
    /// Contact/conversation mutation.
    Action,
    /// AI-generated reply dispatched to the channel.
    AiReply,
    /// Fixed template body dispatched to the channel.
    SendTemplate,
    /// Outbound HTTP POST to a configured URL.
    Webhook,
}

impl NodeKind {
    /// Returns the canonical wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Action => "action",
            Self::AiReply => "ai-reply",
            Self::SendTemplate => "send-template",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for condition nodes.
///
/// Builders occasionally save condition nodes with shapes this engine does
/// not recognize; those deserialize to [`ConditionConfig::Always`], which
/// passes permissively rather than blocking the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// Case-insensitive substring containment in the inbound message.
    MessageContains {
        /// The keyword to look for.
        keyword: String,
    },
    /// Membership test against the contact's tag set.
    ContactHasTag {
        /// The tag to look for.
        tag: String,
    },
    /// Permissive fallback: always passes.
    #[serde(other)]
    Always,
}

/// Configuration for action nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Append a tag to the contact.
    AddTag {
        /// The tag to append.
        tag: String,
    },
    /// Reassign the conversation to an agent.
    AssignAgent {
        /// The agent to assign.
        agent_id: AgentId,
    },
    /// Change the conversation status.
    SetConversationStatus {
        /// The status to set.
        status: ConversationStatus,
    },
}

/// Configuration for a node, varying by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeConfig {
    /// Trigger anchor; carries no payload.
    Trigger,
    /// Condition node configuration.
    Condition(ConditionConfig),
    /// Action node configuration.
    Action(ActionConfig),
    /// AI reply node configuration.
    AiReply {
        /// Node-level system prompt override; falls back to the
        /// workflow-level default when absent.
        system_prompt: Option<String>,
    },
    /// Template send node configuration.
    SendTemplate {
        /// The fixed message body to send.
        body: String,
    },
    /// Outbound webhook node configuration.
    Webhook {
        /// The URL to POST to.
        url: String,
    },
}

impl NodeConfig {
    /// Returns the kind of this node configuration.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Trigger => NodeKind::Trigger,
            Self::Condition(_) => NodeKind::Condition,
            Self::Action(_) => NodeKind::Action,
            Self::AiReply { .. } => NodeKind::AiReply,
            Self::SendTemplate { .. } => NodeKind::SendTemplate,
            Self::Webhook { .. } => NodeKind::Webhook,
        }
    }
}

/// A 2D canvas position, irrelevant to execution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal canvas coordinate.
    pub x: f64,
    /// Vertical canvas coordinate.
    pub y: f64,
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Human-readable label for this node.
    pub label: String,
    /// Node configuration (determines kind and behavior).
    pub config: NodeConfig,
    /// Canvas position for the builder UI.
    #[serde(default)]
    pub position: Position,
}

impl Node {
    /// Creates a new node with the given configuration.
    #[must_use]
    pub fn new(label: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: NodeId::new(),
            label: label.into(),
            config,
            position: Position::default(),
        }
    }

    /// Creates a new node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, label: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id,
            label: label.into(),
            config,
            position: Position::default(),
        }
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    /// Returns true if this is the trigger node.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(self.config, NodeConfig::Trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_wire_names() {
        assert_eq!(NodeKind::AiReply.as_str(), "ai-reply");
        assert_eq!(NodeKind::SendTemplate.as_str(), "send-template");
    }

    #[test]
    fn node_config_kind() {
        let config = NodeConfig::Condition(ConditionConfig::MessageContains {
            keyword: "price".to_string(),
        });
        assert_eq!(config.kind(), NodeKind::Condition);
        assert_eq!(NodeConfig::Trigger.kind(), NodeKind::Trigger);
    }

    #[test]
    fn unknown_condition_shape_deserializes_to_always() {
        let json = r#"{"type": "sentiment_is_negative", "threshold": 0.4}"#;
        let parsed: ConditionConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed, ConditionConfig::Always);
    }

    #[test]
    fn node_serde_roundtrip() {
        let node = Node::new(
            "Tag as lead",
            NodeConfig::Action(ActionConfig::AddTag {
                tag: "lead".to_string(),
            }),
        )
        .at(120.0, 80.0);

        let json = serde_json::to_string(&node).expect("serialize");
        let parsed: Node = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(node, parsed);
    }

    #[test]
    fn ai_reply_config_serde_kind_tag() {
        let node = Node::new(
            "AI responder",
            NodeConfig::AiReply {
                system_prompt: Some("Answer as a florist.".to_string()),
            },
        );
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["config"]["kind"], "ai-reply");
    }
}
