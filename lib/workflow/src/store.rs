//! Store abstraction for the workflow engine.
//!
//! The engine talks to persistence only through [`EngineStore`]. The
//! server binary implements it on Postgres; [`InMemoryStore`] backs the
//! tests and embedded use.

use crate::definition::Workflow;
use crate::execution::ExecutionLog;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inboxflow_conversation::{ConversationStatus, HistoryEntry, Message};
use inboxflow_core::{AgentId, ContactId, ConversationId, ExecutionId, TenantId, WorkflowId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A read query failed.
    QueryFailed { reason: String },
    /// A write failed.
    WriteFailed { reason: String },
    /// The referenced record does not exist.
    NotFound { what: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed { reason } => write!(f, "store query failed: {reason}"),
            Self::WriteFailed { reason } => write!(f, "store write failed: {reason}"),
            Self::NotFound { what } => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// How a run ended, for counter bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run completed.
    Success,
    /// The run failed.
    Failure,
}

/// The persistence surface the engine needs.
///
/// Counter updates in [`record_outcome`](Self::record_outcome) must be
/// atomic read-modify-write operations so concurrent runs never lose
/// increments.
#[async_trait]
pub trait EngineStore: Send + Sync {
    /// Returns all active workflows for a tenant.
    async fn active_workflows(&self, tenant_id: TenantId) -> Result<Vec<Workflow>, StoreError>;

    /// Inserts a fresh execution log.
    async fn insert_execution(&self, log: &ExecutionLog) -> Result<(), StoreError>;

    /// Replaces a previously inserted execution log with its current
    /// state.
    async fn update_execution(&self, log: &ExecutionLog) -> Result<(), StoreError>;

    /// Returns the execution logs recorded for a workflow, newest
    /// first.
    async fn executions_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<ExecutionLog>, StoreError>;

    /// Returns the execution logs recorded across a tenant's workflows,
    /// newest first.
    async fn executions_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ExecutionLog>, StoreError>;

    /// Bumps the workflow's run counters and last-executed timestamp.
    async fn record_outcome(
        &self,
        workflow_id: WorkflowId,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Appends a tag to a contact, ignoring duplicates.
    async fn add_contact_tag(
        &self,
        tenant_id: TenantId,
        contact_id: ContactId,
        tag: &str,
    ) -> Result<(), StoreError>;

    /// Assigns a conversation to an agent.
    async fn assign_conversation(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        agent_id: AgentId,
    ) -> Result<(), StoreError>;

    /// Sets a conversation's status.
    async fn set_conversation_status(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError>;

    /// Records an outbound message on its conversation.
    async fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Returns the most recent history entries for a conversation,
    /// oldest first.
    async fn conversation_history(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    workflows: HashMap<WorkflowId, Workflow>,
    executions: HashMap<ExecutionId, ExecutionLog>,
    execution_order: Vec<ExecutionId>,
    contact_tags: HashMap<ContactId, Vec<String>>,
    assignments: HashMap<ConversationId, AgentId>,
    statuses: HashMap<ConversationId, ConversationStatus>,
    messages: Vec<Message>,
    history: HashMap<ConversationId, Vec<HistoryEntry>>,
}

/// An in-memory [`EngineStore`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
    fail_all: bool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every operation fails, for testing error
    /// paths.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            fail_all: true,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_all {
            return Err(StoreError::QueryFailed {
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Inserts or replaces a workflow.
    pub fn insert_workflow(&self, workflow: Workflow) {
        self.lock().workflows.insert(workflow.id, workflow);
    }

    /// Returns a workflow by ID.
    #[must_use]
    pub fn get_workflow(&self, workflow_id: WorkflowId) -> Option<Workflow> {
        self.lock().workflows.get(&workflow_id).cloned()
    }

    /// Seeds conversation history, oldest first.
    pub fn seed_history(&self, conversation_id: ConversationId, entries: Vec<HistoryEntry>) {
        self.lock().history.insert(conversation_id, entries);
    }

    /// Returns the tags recorded for a contact.
    #[must_use]
    pub fn contact_tags(&self, contact_id: ContactId) -> Vec<String> {
        self.lock().contact_tags.get(&contact_id).cloned().unwrap_or_default()
    }

    /// Returns the agent a conversation is assigned to, if any.
    #[must_use]
    pub fn assignment(&self, conversation_id: ConversationId) -> Option<AgentId> {
        self.lock().assignments.get(&conversation_id).copied()
    }

    /// Returns the recorded status of a conversation, if set.
    #[must_use]
    pub fn conversation_status(&self, conversation_id: ConversationId) -> Option<ConversationStatus> {
        self.lock().statuses.get(&conversation_id).copied()
    }

    /// Returns all recorded outbound messages.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }
}

#[async_trait]
impl EngineStore for InMemoryStore {
    async fn active_workflows(&self, tenant_id: TenantId) -> Result<Vec<Workflow>, StoreError> {
        self.check()?;
        let state = self.lock();
        let mut workflows: Vec<_> = state
            .workflows
            .values()
            .filter(|w| w.tenant_id == tenant_id && w.is_active())
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.created_at);
        Ok(workflows)
    }

    async fn insert_execution(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.lock();
        state.executions.insert(log.id, log.clone());
        state.execution_order.push(log.id);
        Ok(())
    }

    async fn update_execution(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.lock();
        if !state.executions.contains_key(&log.id) {
            return Err(StoreError::NotFound {
                what: format!("execution {}", log.id),
            });
        }
        state.executions.insert(log.id, log.clone());
        Ok(())
    }

    async fn executions_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        self.check()?;
        let state = self.lock();
        Ok(state
            .execution_order
            .iter()
            .rev()
            .filter_map(|id| state.executions.get(id))
            .filter(|log| log.workflow_id == workflow_id)
            .cloned()
            .collect())
    }

    async fn executions_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        self.check()?;
        let state = self.lock();
        Ok(state
            .execution_order
            .iter()
            .rev()
            .filter_map(|id| state.executions.get(id))
            .filter(|log| log.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn record_outcome(
        &self,
        workflow_id: WorkflowId,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.lock();
        let workflow = state.workflows.get_mut(&workflow_id).ok_or_else(|| {
            StoreError::NotFound {
                what: format!("workflow {workflow_id}"),
            }
        })?;
        workflow.counters.executions += 1;
        match outcome {
            RunOutcome::Success => workflow.counters.successes += 1,
            RunOutcome::Failure => workflow.counters.errors += 1,
        }
        workflow.last_executed_at = Some(at);
        Ok(())
    }

    async fn add_contact_tag(
        &self,
        _tenant_id: TenantId,
        contact_id: ContactId,
        tag: &str,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.lock();
        let tags = state.contact_tags.entry(contact_id).or_default();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        Ok(())
    }

    async fn assign_conversation(
        &self,
        _tenant_id: TenantId,
        conversation_id: ConversationId,
        agent_id: AgentId,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.lock().assignments.insert(conversation_id, agent_id);
        Ok(())
    }

    async fn set_conversation_status(
        &self,
        _tenant_id: TenantId,
        conversation_id: ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.lock().statuses.insert(conversation_id, status);
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.lock();
        state
            .history
            .entry(message.conversation_id)
            .or_default()
            .push(HistoryEntry {
                sender: message.sender,
                content: message.content.clone(),
                timestamp: Some(message.timestamp),
            });
        state.messages.push(message.clone());
        Ok(())
    }

    async fn conversation_history(
        &self,
        _tenant_id: TenantId,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        self.check()?;
        let state = self.lock();
        let entries = state.history.get(&conversation_id).cloned().unwrap_or_default();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionLog, TriggerSnapshot};
    use crate::trigger::TriggerSpec;
    use inboxflow_conversation::{Channel, MessageSender};
    use inboxflow_core::MessageId;

    fn sample_trigger() -> TriggerSnapshot {
        TriggerSnapshot {
            message_id: MessageId::new(),
            contact_id: ContactId::new(),
            channel: Channel::Whatsapp,
            content: "hello".to_string(),
        }
    }

    fn sample_log(workflow_id: WorkflowId) -> ExecutionLog {
        ExecutionLog::start(
            workflow_id,
            "Sample Flow",
            TenantId::new(),
            ConversationId::new(),
            sample_trigger(),
        )
    }

    fn tenant_log(tenant_id: TenantId) -> ExecutionLog {
        ExecutionLog::start(
            WorkflowId::new(),
            "Sample Flow",
            tenant_id,
            ConversationId::new(),
            sample_trigger(),
        )
    }

    #[tokio::test]
    async fn active_workflows_filters_status_and_tenant() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();

        let active = Workflow::new(tenant_id, "Active", TriggerSpec::new_message()).activated();
        let draft = Workflow::new(tenant_id, "Draft", TriggerSpec::new_message());
        let other =
            Workflow::new(TenantId::new(), "Other tenant", TriggerSpec::new_message()).activated();
        let active_id = active.id;
        store.insert_workflow(active);
        store.insert_workflow(draft);
        store.insert_workflow(other);

        let found = store.active_workflows(tenant_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active_id);
    }

    #[tokio::test]
    async fn execution_insert_then_update() {
        let store = InMemoryStore::new();
        let workflow_id = WorkflowId::new();
        let mut log = sample_log(workflow_id);

        store.insert_execution(&log).await.unwrap();
        log.complete();
        store.update_execution(&log).await.unwrap();

        let logs = store.executions_for_workflow(workflow_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, crate::execution::ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn executions_for_tenant_filters_and_orders_newest_first() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();

        let first = tenant_log(tenant_id);
        let foreign = tenant_log(TenantId::new());
        let second = tenant_log(tenant_id);
        store.insert_execution(&first).await.unwrap();
        store.insert_execution(&foreign).await.unwrap();
        store.insert_execution(&second).await.unwrap();

        let logs = store.executions_for_tenant(tenant_id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, second.id);
        assert_eq!(logs[1].id, first.id);
    }

    #[tokio::test]
    async fn update_unknown_execution_is_not_found() {
        let store = InMemoryStore::new();
        let log = sample_log(WorkflowId::new());
        let result = store.update_execution(&log).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn record_outcome_bumps_counters() {
        let store = InMemoryStore::new();
        let workflow =
            Workflow::new(TenantId::new(), "Counters", TriggerSpec::new_message()).activated();
        let workflow_id = workflow.id;
        store.insert_workflow(workflow);

        store
            .record_outcome(workflow_id, RunOutcome::Success, Utc::now())
            .await
            .unwrap();
        store
            .record_outcome(workflow_id, RunOutcome::Failure, Utc::now())
            .await
            .unwrap();

        let workflow = store.get_workflow(workflow_id).unwrap();
        assert_eq!(workflow.counters.executions, 2);
        assert_eq!(workflow.counters.successes, 1);
        assert_eq!(workflow.counters.errors, 1);
        assert!(workflow.last_executed_at.is_some());
    }

    #[tokio::test]
    async fn add_contact_tag_ignores_duplicates() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let contact_id = ContactId::new();

        store.add_contact_tag(tenant_id, contact_id, "vip").await.unwrap();
        store.add_contact_tag(tenant_id, contact_id, "vip").await.unwrap();

        assert_eq!(store.contact_tags(contact_id), vec!["vip"]);
    }

    #[tokio::test]
    async fn insert_message_extends_history() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let conversation_id = ConversationId::new();
        store.seed_history(conversation_id, vec![HistoryEntry::contact("hi")]);

        let message = Message::bot_reply(
            tenant_id,
            conversation_id,
            "hello there",
            WorkflowId::new(),
            None,
        );
        store.insert_message(&message).await.unwrap();

        let history = store
            .conversation_history(tenant_id, conversation_id, 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "hello there");

        let limited = store
            .conversation_history(tenant_id, conversation_id, 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].content, "hello there");
    }

    #[tokio::test]
    async fn insert_message_keeps_sender_attribution() {
        let store = InMemoryStore::new();
        let tenant_id = TenantId::new();
        let conversation_id = ConversationId::new();

        let template = Message::template(tenant_id, conversation_id, "Welcome!", WorkflowId::new());
        store.insert_message(&template).await.unwrap();

        let history = store
            .conversation_history(tenant_id, conversation_id, 10)
            .await
            .unwrap();
        assert_eq!(history[0].sender, MessageSender::Template);
        assert!(history[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn failing_store_errors_everything() {
        let store = InMemoryStore::failing();
        let result = store.active_workflows(TenantId::new()).await;
        assert!(matches!(result, Err(StoreError::QueryFailed { .. })));
    }
}
