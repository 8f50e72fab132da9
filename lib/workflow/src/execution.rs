//! Per-run audit log types.
//!
//! Every workflow run produces an [`ExecutionLog`]: what triggered it,
//! every node step taken, and how the run ended. The log is persisted
//! incrementally so a crash mid-run still leaves a usable record.

use crate::node::NodeKind;
use chrono::{DateTime, Utc};
use inboxflow_conversation::Channel;
use inboxflow_core::{ContactId, ConversationId, ExecutionId, MessageId, NodeId, TenantId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The overall state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Run is actively executing.
    Running,
    /// Run completed successfully.
    Completed,
    /// Run failed.
    Failed,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How a single node step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Handler finished and the walk continued.
    Completed,
    /// A condition evaluated false and ended the run.
    Halted,
    /// Handler failed, failing the run.
    Failed,
}

/// A record of a single node step within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// The node that ran.
    pub node_id: NodeId,
    /// The node's kind at execution time.
    pub kind: NodeKind,
    /// The node's label at execution time.
    pub label: String,
    /// How the step ended.
    pub status: StepStatus,
    /// Structured handler output, if any.
    pub output: Option<JsonValue>,
    /// Error message if the step failed.
    pub error: Option<String>,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// When the step finished.
    pub finished_at: DateTime<Utc>,
}

/// Snapshot of the triggering event, embedded in the log so it stays
/// readable after the source message is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSnapshot {
    /// The message that started the run.
    pub message_id: MessageId,
    /// The contact who sent it.
    pub contact_id: ContactId,
    /// The channel it arrived on.
    pub channel: Channel,
    /// The message text.
    pub content: String,
}

/// The audit record of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    /// Unique identifier for this run.
    pub id: ExecutionId,
    /// The workflow that ran.
    pub workflow_id: WorkflowId,
    /// The workflow's name at run time, kept so the log stays readable
    /// after a rename.
    pub workflow_name: String,
    /// The tenant the run belongs to.
    pub tenant_id: TenantId,
    /// The conversation the run acted on.
    pub conversation_id: ConversationId,
    /// Current run state.
    pub status: ExecutionStatus,
    /// What triggered the run.
    pub trigger: TriggerSnapshot,
    /// Node steps taken so far, in execution order.
    pub steps: Vec<ExecutionStep>,
    /// Error message if failed.
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionLog {
    /// Creates a new running log for a workflow run.
    #[must_use]
    pub fn start(
        workflow_id: WorkflowId,
        workflow_name: impl Into<String>,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        trigger: TriggerSnapshot,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            workflow_name: workflow_name.into(),
            tenant_id,
            conversation_id,
            status: ExecutionStatus::Running,
            trigger,
            steps: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Appends a step record.
    pub fn record_step(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }

    /// Marks the run as completed.
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the run as failed.
    pub fn fail(&mut self, error: String) {
        self.status = ExecutionStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Returns the number of steps taken so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns the duration of the run in milliseconds, using now for a
    /// run still in flight.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}
