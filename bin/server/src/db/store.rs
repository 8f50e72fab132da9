//! Postgres implementation of the engine's store trait.
//!
//! IDs are prefixed ULIDs stored as TEXT; graph, trigger, and step
//! payloads are JSONB for flexible schema evolution. Counter updates are
//! single atomic UPDATE statements so concurrent runs never lose
//! increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inboxflow_conversation::{ConversationStatus, HistoryEntry, Message, MessageSender};
use inboxflow_core::{AgentId, ContactId, ConversationId, TenantId, WorkflowId};
use inboxflow_workflow::{
    EngineStore, ExecutionLog, ExecutionStatus, RunOutcome, StoreError, Workflow, WorkflowCounters,
    WorkflowStatus,
};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Postgres-backed [`EngineStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_failed(e: impl std::fmt::Display) -> StoreError {
    StoreError::QueryFailed {
        reason: e.to_string(),
    }
}

fn write_failed(e: impl std::fmt::Display) -> StoreError {
    StoreError::WriteFailed {
        reason: e.to_string(),
    }
}

/// Deserializes a snake_case enum stored as TEXT.
fn enum_from_text<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|e| query_failed(format!("invalid enum value '{value}': {e}")))
}

/// Serializes a snake_case enum to its TEXT representation.
fn enum_to_text<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value).map_err(write_failed)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(write_failed(format!("expected string enum, got {other}"))),
    }
}

#[derive(FromRow)]
struct WorkflowRow {
    id: String,
    tenant_id: String,
    name: String,
    status: String,
    trigger: serde_json::Value,
    graph: serde_json::Value,
    ai_system_prompt: Option<String>,
    executions: i64,
    successes: i64,
    errors: i64,
    last_executed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn try_into_workflow(self) -> Result<Workflow, StoreError> {
        let id = WorkflowId::from_str(&self.id)
            .map_err(|e| query_failed(format!("invalid workflow id '{}': {e}", self.id)))?;
        let tenant_id = TenantId::from_str(&self.tenant_id)
            .map_err(|e| query_failed(format!("invalid tenant id '{}': {e}", self.tenant_id)))?;
        let status: WorkflowStatus = enum_from_text(&self.status)?;
        let trigger = serde_json::from_value(self.trigger)
            .map_err(|e| query_failed(format!("invalid trigger payload: {e}")))?;
        let mut graph: inboxflow_workflow::WorkflowGraph = serde_json::from_value(self.graph)
            .map_err(|e| query_failed(format!("invalid graph payload: {e}")))?;
        graph.rebuild_index_map();

        Ok(Workflow {
            id,
            tenant_id,
            name: self.name,
            status,
            trigger,
            graph,
            ai_system_prompt: self.ai_system_prompt,
            counters: WorkflowCounters {
                executions: self.executions.max(0) as u64,
                successes: self.successes.max(0) as u64,
                errors: self.errors.max(0) as u64,
            },
            last_executed_at: self.last_executed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ExecutionRow {
    id: String,
    workflow_id: String,
    workflow_name: String,
    tenant_id: String,
    conversation_id: String,
    status: String,
    trigger: serde_json::Value,
    steps: serde_json::Value,
    error: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRow {
    fn try_into_log(self) -> Result<ExecutionLog, StoreError> {
        let id = inboxflow_core::ExecutionId::from_str(&self.id)
            .map_err(|e| query_failed(format!("invalid execution id '{}': {e}", self.id)))?;
        let workflow_id = WorkflowId::from_str(&self.workflow_id)
            .map_err(|e| query_failed(format!("invalid workflow id '{}': {e}", self.workflow_id)))?;
        let tenant_id = TenantId::from_str(&self.tenant_id)
            .map_err(|e| query_failed(format!("invalid tenant id '{}': {e}", self.tenant_id)))?;
        let conversation_id = ConversationId::from_str(&self.conversation_id).map_err(|e| {
            query_failed(format!(
                "invalid conversation id '{}': {e}",
                self.conversation_id
            ))
        })?;
        let status: ExecutionStatus = enum_from_text(&self.status)?;
        let trigger = serde_json::from_value(self.trigger)
            .map_err(|e| query_failed(format!("invalid trigger snapshot: {e}")))?;
        let steps = serde_json::from_value(self.steps)
            .map_err(|e| query_failed(format!("invalid steps payload: {e}")))?;

        Ok(ExecutionLog {
            id,
            workflow_id,
            workflow_name: self.workflow_name,
            tenant_id,
            conversation_id,
            status,
            trigger,
            steps,
            error: self.error,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    sender: String,
    content: String,
    timestamp: DateTime<Utc>,
}

#[async_trait]
impl EngineStore for PgStore {
    async fn active_workflows(&self, tenant_id: TenantId) -> Result<Vec<Workflow>, StoreError> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, status, trigger, graph, ai_system_prompt,
                   executions, successes, errors, last_executed_at,
                   created_at, updated_at
            FROM workflows
            WHERE tenant_id = $1 AND status = 'active'
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.into_iter().map(WorkflowRow::try_into_workflow).collect()
    }

    async fn insert_execution(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        let status = enum_to_text(&log.status)?;
        sqlx::query(
            r#"
            INSERT INTO executions
                (id, workflow_id, workflow_name, tenant_id, conversation_id,
                 status, trigger, steps, error, started_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(log.id.to_string())
        .bind(log.workflow_id.to_string())
        .bind(&log.workflow_name)
        .bind(log.tenant_id.to_string())
        .bind(log.conversation_id.to_string())
        .bind(status)
        .bind(serde_json::to_value(&log.trigger).map_err(write_failed)?)
        .bind(serde_json::to_value(&log.steps).map_err(write_failed)?)
        .bind(&log.error)
        .bind(log.started_at)
        .bind(log.finished_at)
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;
        Ok(())
    }

    async fn update_execution(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        let status = enum_to_text(&log.status)?;
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = $2, steps = $3, error = $4, finished_at = $5
            WHERE id = $1
            "#,
        )
        .bind(log.id.to_string())
        .bind(status)
        .bind(serde_json::to_value(&log.steps).map_err(write_failed)?)
        .bind(&log.error)
        .bind(log.finished_at)
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("execution {}", log.id),
            });
        }
        Ok(())
    }

    async fn executions_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, workflow_name, tenant_id, conversation_id,
                   status, trigger, steps, error, started_at, finished_at
            FROM executions
            WHERE workflow_id = $1
            ORDER BY started_at DESC
            "#,
        )
        .bind(workflow_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.into_iter().map(ExecutionRow::try_into_log).collect()
    }

    async fn executions_for_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        let rows: Vec<ExecutionRow> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, workflow_name, tenant_id, conversation_id,
                   status, trigger, steps, error, started_at, finished_at
            FROM executions
            WHERE tenant_id = $1
            ORDER BY started_at DESC
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.into_iter().map(ExecutionRow::try_into_log).collect()
    }

    async fn record_outcome(
        &self,
        workflow_id: WorkflowId,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let (successes, errors) = match outcome {
            RunOutcome::Success => (1i64, 0i64),
            RunOutcome::Failure => (0i64, 1i64),
        };
        let result = sqlx::query(
            r#"
            UPDATE workflows
            SET executions = executions + 1,
                successes = successes + $2,
                errors = errors + $3,
                last_executed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(workflow_id.to_string())
        .bind(successes)
        .bind(errors)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("workflow {workflow_id}"),
            });
        }
        Ok(())
    }

    async fn add_contact_tag(
        &self,
        tenant_id: TenantId,
        contact_id: ContactId,
        tag: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET tags = array_append(tags, $3), updated_at = now()
            WHERE tenant_id = $1 AND id = $2 AND NOT ($3 = ANY(tags))
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(contact_id.to_string())
        .bind(tag)
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;

        if result.rows_affected() == 0 {
            // Either the tag was already present or the contact is gone.
            let exists: (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM contacts WHERE tenant_id = $1 AND id = $2)",
            )
            .bind(tenant_id.to_string())
            .bind(contact_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(query_failed)?;
            if !exists.0 {
                return Err(StoreError::NotFound {
                    what: format!("contact {contact_id}"),
                });
            }
        }
        Ok(())
    }

    async fn assign_conversation(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        agent_id: AgentId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET assigned_agent_id = $3, updated_at = now()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(conversation_id.to_string())
        .bind(agent_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("conversation {conversation_id}"),
            });
        }
        Ok(())
    }

    async fn set_conversation_status(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET status = $3, updated_at = now()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(conversation_id.to_string())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("conversation {conversation_id}"),
            });
        }
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let sender = enum_to_text(&message.sender)?;
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, tenant_id, conversation_id, sender, content,
                 timestamp, workflow_id, tokens_used)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.tenant_id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(sender)
        .bind(&message.content)
        .bind(message.timestamp)
        .bind(message.workflow_id.map(|id| id.to_string()))
        .bind(message.tokens_used.map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(write_failed)?;
        Ok(())
    }

    async fn conversation_history(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT sender, content, timestamp
            FROM messages
            WHERE tenant_id = $1 AND conversation_id = $2
            ORDER BY timestamp DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(conversation_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        let mut entries = rows
            .into_iter()
            .map(|row| {
                let sender: MessageSender = enum_from_text(&row.sender)?;
                Ok(HistoryEntry {
                    sender,
                    content: row.content,
                    timestamp: Some(row.timestamp),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        entries.reverse();
        Ok(entries)
    }
}
