//! Workflow definition types.
//!
//! A workflow is a tenant-owned automation that consists of:
//! - Metadata (name, status, timestamps)
//! - A trigger specification, denormalized from the graph for matching
//! - A directed graph of nodes
//! - Lifetime execution counters

use crate::graph::WorkflowGraph;
use crate::trigger::TriggerSpec;
use chrono::{DateTime, Utc};
use inboxflow_core::{TenantId, WorkflowId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow.
///
/// Only active workflows are considered by the trigger matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Being edited, never matched.
    Draft,
    /// Live and eligible for matching.
    Active,
    /// Temporarily suspended, never matched.
    Inactive,
}

impl WorkflowStatus {
    /// Returns the canonical wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Lifetime execution counters for a workflow.
///
/// Persisted alongside the definition and bumped once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowCounters {
    /// Total runs started.
    pub executions: u64,
    /// Runs that completed successfully.
    pub successes: u64,
    /// Runs that failed.
    pub errors: u64,
}

/// A complete workflow definition.
///
/// This is the source of truth for a workflow. The trigger spec is kept
/// outside the graph so the matcher never has to deserialize node
/// configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// The tenant this workflow belongs to.
    pub tenant_id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Lifecycle status.
    pub status: WorkflowStatus,
    /// What starts a run.
    pub trigger: TriggerSpec,
    /// The workflow graph (nodes and edges).
    pub graph: WorkflowGraph,
    /// Workflow-level system prompt for AI reply nodes without their own.
    pub ai_system_prompt: Option<String>,
    /// Lifetime run counters.
    #[serde(default)]
    pub counters: WorkflowCounters,
    /// When this workflow last started a run.
    pub last_executed_at: Option<DateTime<Utc>>,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a new draft workflow with the given name and trigger.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>, trigger: TriggerSpec) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            tenant_id,
            name: name.into(),
            status: WorkflowStatus::Draft,
            trigger,
            graph: WorkflowGraph::new(),
            ai_system_prompt: None,
            counters: WorkflowCounters::default(),
            last_executed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the workflow graph.
    #[must_use]
    pub fn with_graph(mut self, graph: WorkflowGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Sets the workflow-level AI system prompt.
    #[must_use]
    pub fn with_ai_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.ai_system_prompt = Some(prompt.into());
        self
    }

    /// Marks the workflow active.
    #[must_use]
    pub fn activated(mut self) -> Self {
        self.status = WorkflowStatus::Active;
        self
    }

    /// Returns whether the matcher should consider this workflow.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }

    /// Takes the workflow out of matching.
    pub fn deactivate(&mut self) {
        self.status = WorkflowStatus::Inactive;
        self.updated_at = Utc::now();
    }

    /// Activates the workflow.
    pub fn activate(&mut self) {
        self.status = WorkflowStatus::Active;
        self.updated_at = Utc::now();
    }

    /// Validates the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow graph is invalid.
    pub fn validate(&self) -> Result<(), crate::error::GraphError> {
        self.graph.validate()
    }

    /// Marks the workflow as updated (bumps updated_at timestamp).
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::node::{Node, NodeConfig};

    #[test]
    fn workflow_creation() {
        let workflow = Workflow::new(TenantId::new(), "Welcome flow", TriggerSpec::new_message());
        assert_eq!(workflow.name, "Welcome flow");
        assert_eq!(workflow.status, WorkflowStatus::Draft);
        assert!(!workflow.is_active());
        assert_eq!(workflow.counters, WorkflowCounters::default());
    }

    #[test]
    fn workflow_deactivate_and_activate() {
        let mut workflow =
            Workflow::new(TenantId::new(), "Welcome flow", TriggerSpec::new_message()).activated();
        assert!(workflow.is_active());

        workflow.deactivate();
        assert_eq!(workflow.status, WorkflowStatus::Inactive);
        assert!(!workflow.is_active());

        workflow.activate();
        assert!(workflow.is_active());
    }

    #[test]
    fn workflow_serde_roundtrip() {
        let mut graph = WorkflowGraph::new();
        let trigger_id = graph.add_node(Node::new("Trigger", NodeConfig::Trigger));
        let template_id = graph.add_node(Node::new(
            "Greeting",
            NodeConfig::SendTemplate {
                body: "Welcome!".to_string(),
            },
        ));
        graph.add_edge(Edge::new(trigger_id, template_id)).unwrap();

        let workflow = Workflow::new(TenantId::new(), "Welcome flow", TriggerSpec::new_message())
            .with_graph(graph)
            .with_ai_system_prompt("Answer as a florist.")
            .activated();

        let json = serde_json::to_string(&workflow).expect("serialize");
        let mut parsed: Workflow = serde_json::from_str(&json).expect("deserialize");
        parsed.graph.rebuild_index_map();

        assert_eq!(workflow.id, parsed.id);
        assert_eq!(parsed.graph.node_count(), 2);
        assert!(parsed.is_active());
        assert_eq!(parsed.graph.next_after(trigger_id).unwrap().id, template_id);
    }
}
