//! Node handlers.
//!
//! One handler per node kind, dispatched over [`NodeConfig`]. Handlers
//! never panic and never return `Err`; every failure is folded into
//! [`HandlerOutcome::Failed`] so the executor can log it and fail the run
//! without tearing anything else down.

use crate::context::ExecutionContext;
use crate::definition::Workflow;
use crate::node::{ActionConfig, ConditionConfig, Node, NodeConfig};
use crate::store::EngineStore;
use inboxflow_ai::{PromptAssembly, ReplyBackend};
use inboxflow_channel::ChannelRouter;
use inboxflow_conversation::{ConversationHistory, Message, MessageSender};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::debug;

/// The result of running one node.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// The node finished; the walk continues to its successor.
    Completed { output: Option<JsonValue> },
    /// The node finished and asked the walk to stop; the run still
    /// counts as completed.
    Halted { output: Option<JsonValue> },
    /// The node failed; the run fails.
    Failed { error: String },
}

impl HandlerOutcome {
    fn completed(output: JsonValue) -> Self {
        Self::Completed {
            output: Some(output),
        }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

/// Executes individual workflow nodes.
pub struct NodeHandlers {
    reply_backend: Arc<dyn ReplyBackend>,
    channels: ChannelRouter,
    store: Arc<dyn EngineStore>,
    http: reqwest::Client,
}

impl NodeHandlers {
    /// Creates handlers over the given backends.
    #[must_use]
    pub fn new(
        reply_backend: Arc<dyn ReplyBackend>,
        channels: ChannelRouter,
        store: Arc<dyn EngineStore>,
    ) -> Self {
        Self {
            reply_backend,
            channels,
            store,
            http: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client used for webhook nodes.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Runs a single node against the run context.
    pub async fn handle(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
        workflow: &Workflow,
    ) -> HandlerOutcome {
        debug!(node_id = %node.id, kind = %node.kind(), "running node");
        match &node.config {
            NodeConfig::Trigger => HandlerOutcome::Completed { output: None },
            NodeConfig::Condition(condition) => self.handle_condition(condition, context),
            NodeConfig::Action(action) => self.handle_action(action, context).await,
            NodeConfig::AiReply { system_prompt } => {
                self.handle_ai_reply(system_prompt.as_deref(), context, workflow)
                    .await
            }
            NodeConfig::SendTemplate { body } => {
                self.handle_send_template(body, context, workflow).await
            }
            NodeConfig::Webhook { url } => self.handle_webhook(url, context, workflow).await,
        }
    }

    fn handle_condition(
        &self,
        condition: &ConditionConfig,
        context: &ExecutionContext,
    ) -> HandlerOutcome {
        let passed = match condition {
            ConditionConfig::MessageContains { keyword } => context
                .message_content
                .to_lowercase()
                .contains(&keyword.to_lowercase()),
            ConditionConfig::ContactHasTag { tag } => context.contact.has_tag(tag),
            ConditionConfig::Always => true,
        };

        let output = json!({ "passed": passed });
        if passed {
            HandlerOutcome::completed(output)
        } else {
            HandlerOutcome::Halted {
                output: Some(output),
            }
        }
    }

    async fn handle_action(
        &self,
        action: &ActionConfig,
        context: &mut ExecutionContext,
    ) -> HandlerOutcome {
        let result = match action {
            ActionConfig::AddTag { tag } => {
                let result = self
                    .store
                    .add_contact_tag(context.tenant_id, context.contact_id, tag)
                    .await;
                if result.is_ok() {
                    // Later conditions in the same run see the new tag.
                    context.add_contact_tag(tag);
                }
                result.map(|()| json!({ "tag": tag }))
            }
            ActionConfig::AssignAgent { agent_id } => self
                .store
                .assign_conversation(context.tenant_id, context.conversation_id, *agent_id)
                .await
                .map(|()| json!({ "agent_id": agent_id })),
            ActionConfig::SetConversationStatus { status } => self
                .store
                .set_conversation_status(context.tenant_id, context.conversation_id, *status)
                .await
                .map(|()| json!({ "status": status.as_str() })),
        };

        match result {
            Ok(output) => HandlerOutcome::completed(output),
            Err(error) => HandlerOutcome::failed(error),
        }
    }

    async fn handle_ai_reply(
        &self,
        node_prompt: Option<&str>,
        context: &ExecutionContext,
        workflow: &Workflow,
    ) -> HandlerOutcome {
        let history = match self
            .store
            .conversation_history(
                context.tenant_id,
                context.conversation_id,
                ConversationHistory::DEFAULT_CAPACITY,
            )
            .await
        {
            Ok(mut entries) => {
                // Ingestion persists the triggering message before the
                // run, so it is already the last history entry. The
                // prompt appends the inbound message itself.
                if entries.last().is_some_and(|entry| {
                    entry.sender == MessageSender::Contact
                        && entry.content == context.message_content
                }) {
                    entries.pop();
                }
                ConversationHistory::from_entries(entries)
            }
            Err(error) => return HandlerOutcome::failed(error),
        };

        let system_prompt = node_prompt.or(workflow.ai_system_prompt.as_deref());
        let request = PromptAssembly::new(system_prompt).build_request(
            &context.contact,
            &history,
            &context.message_content,
        );

        let response = match self.reply_backend.generate(&request).await {
            Ok(response) => response,
            Err(error) => return HandlerOutcome::failed(error),
        };

        if let Err(error) = self
            .channels
            .send_text(context.channel, &context.contact, &response.reply)
            .await
        {
            return HandlerOutcome::failed(error);
        }

        let tokens = response.usage.total();
        let message = Message::bot_reply(
            context.tenant_id,
            context.conversation_id,
            &response.reply,
            workflow.id,
            Some(tokens),
        );
        if let Err(error) = self.store.insert_message(&message).await {
            return HandlerOutcome::failed(error);
        }

        HandlerOutcome::completed(json!({
            "reply": response.reply,
            "tokens_used": tokens,
        }))
    }

    async fn handle_send_template(
        &self,
        body: &str,
        context: &ExecutionContext,
        workflow: &Workflow,
    ) -> HandlerOutcome {
        if let Err(error) = self
            .channels
            .send_text(context.channel, &context.contact, body)
            .await
        {
            return HandlerOutcome::failed(error);
        }

        let message =
            Message::template(context.tenant_id, context.conversation_id, body, workflow.id);
        if let Err(error) = self.store.insert_message(&message).await {
            return HandlerOutcome::failed(error);
        }

        HandlerOutcome::completed(json!({ "body": body }))
    }

    async fn handle_webhook(
        &self,
        url: &str,
        context: &ExecutionContext,
        workflow: &Workflow,
    ) -> HandlerOutcome {
        let payload = json!({
            "workflow_id": workflow.id,
            "tenant_id": context.tenant_id,
            "conversation_id": context.conversation_id,
            "message_id": context.message_id,
            "contact_id": context.contact_id,
            "channel": context.channel,
            "message": context.message_content,
            "contact": context.contact,
            "triggered_at": context.started_at,
        });

        let response = match self.http.post(url).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => {
                return HandlerOutcome::failed(format!("webhook request failed: {error}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return HandlerOutcome::failed(format!(
                "webhook returned status {}",
                status.as_u16()
            ));
        }

        // The receiver's body is kept for operator inspection only. Later
        // nodes never read it.
        let body = response.text().await.unwrap_or_default();
        HandlerOutcome::completed(json!({ "status": status.as_u16(), "body": body }))
    }
}
