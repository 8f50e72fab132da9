//! Engine entry point.
//!
//! Ties the trigger matcher and executor together: one inbound message
//! event in, one isolated run per matched workflow out. Runs for the
//! same event execute concurrently and cannot fail each other.

use crate::context::InboundMessage;
use crate::executor::{ExecutionReport, Executor, ExecutorConfig};
use crate::handler::NodeHandlers;
use crate::matcher::TriggerMatcher;
use crate::store::EngineStore;
use futures::future::join_all;
use inboxflow_ai::ReplyBackend;
use inboxflow_channel::ChannelRouter;
use std::sync::Arc;
use tracing::info;

/// The workflow automation engine.
pub struct Engine {
    matcher: TriggerMatcher,
    executor: Executor,
}

impl Engine {
    /// Wires an engine over a store, a reply backend, and channel
    /// senders.
    #[must_use]
    pub fn new(
        store: Arc<dyn EngineStore>,
        reply_backend: Arc<dyn ReplyBackend>,
        channels: ChannelRouter,
    ) -> Self {
        let handlers = Arc::new(NodeHandlers::new(reply_backend, channels, store.clone()));
        Self {
            matcher: TriggerMatcher::new(store.clone()),
            executor: Executor::new(handlers, store),
        }
    }

    /// Overrides the executor limits.
    #[must_use]
    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = self.executor.with_config(config);
        self
    }

    /// Handles one inbound message event.
    ///
    /// Matches the event against the tenant's active workflows and runs
    /// every match to completion concurrently. Returns one report per
    /// run; an empty vec means nothing matched.
    pub async fn on_message(&self, event: &InboundMessage) -> Vec<ExecutionReport> {
        let workflows = self.matcher.find_triggered(event).await;
        if workflows.is_empty() {
            return Vec::new();
        }

        info!(
            tenant_id = %event.tenant_id,
            message_id = %event.message_id,
            matched = workflows.len(),
            "dispatching workflow runs"
        );

        join_all(
            workflows
                .iter()
                .map(|workflow| self.executor.execute(workflow, event)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Workflow;
    use crate::edge::Edge;
    use crate::graph::WorkflowGraph;
    use crate::node::{ActionConfig, ConditionConfig, Node, NodeConfig};
    use crate::store::InMemoryStore;
    use crate::trigger::TriggerSpec;
    use chrono::Utc;
    use inboxflow_ai::MockReplyBackend;
    use inboxflow_channel::RecordingSender;
    use inboxflow_conversation::{Channel, ContactSnapshot};
    use inboxflow_core::{ContactId, ConversationId, MessageId, TenantId};

    fn event(tenant_id: TenantId, content: &str) -> InboundMessage {
        InboundMessage {
            tenant_id,
            conversation_id: ConversationId::new(),
            message_id: MessageId::new(),
            contact_id: ContactId::new(),
            channel: Channel::Whatsapp,
            content: content.to_string(),
            contact: ContactSnapshot::new("Dana").with_phone("+15551234567"),
            received_at: Utc::now(),
        }
    }

    fn engine(store: Arc<InMemoryStore>) -> Engine {
        let channels = ChannelRouter::new().with_whatsapp(Arc::new(RecordingSender::new()));
        Engine::new(
            store,
            Arc::new(MockReplyBackend::replying("Sure!")),
            channels,
        )
    }

    fn escalation_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        let trigger = graph.add_node(Node::new("Trigger", NodeConfig::Trigger));
        let condition = graph.add_node(Node::new(
            "Wants a human",
            NodeConfig::Condition(ConditionConfig::MessageContains {
                keyword: "human".to_string(),
            }),
        ));
        let action = graph.add_node(Node::new(
            "Tag for handoff",
            NodeConfig::Action(ActionConfig::AddTag {
                tag: "Human-Required".to_string(),
            }),
        ));
        graph.add_edge(Edge::new(trigger, condition)).unwrap();
        graph.add_edge(Edge::new(condition, action)).unwrap();
        graph
    }

    #[tokio::test]
    async fn end_to_end_escalation_run() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let workflow = Workflow::new(tenant_id, "Escalation", TriggerSpec::new_message())
            .with_graph(escalation_graph())
            .activated();
        let workflow_id = workflow.id;
        store.insert_workflow(workflow);

        let event = event(tenant_id, "I need a human");
        let reports = engine(store.clone()).on_message(&event).await;

        assert_eq!(reports.len(), 1);
        assert!(reports[0].success);
        assert_eq!(reports[0].steps, 3);
        assert_eq!(store.contact_tags(event.contact_id), vec!["Human-Required"]);

        let stored = store.get_workflow(workflow_id).unwrap();
        assert_eq!(stored.counters.successes, 1);
    }

    #[tokio::test]
    async fn no_match_runs_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let workflow = Workflow::new(tenant_id, "Pricing", TriggerSpec::keyword_match(["price"]))
            .with_graph(escalation_graph())
            .activated();
        store.insert_workflow(workflow);

        let reports = engine(store).on_message(&event(tenant_id, "hello")).await;
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn one_failing_workflow_does_not_affect_the_other() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();

        let healthy = Workflow::new(tenant_id, "Healthy", TriggerSpec::new_message())
            .with_graph(escalation_graph())
            .activated();
        let healthy_id = healthy.id;

        // Graph without a trigger node fails every run.
        let mut broken_graph = WorkflowGraph::new();
        broken_graph.add_node(Node::new(
            "Orphan",
            NodeConfig::Action(ActionConfig::AddTag {
                tag: "never".to_string(),
            }),
        ));
        let broken = Workflow::new(tenant_id, "Broken", TriggerSpec::new_message())
            .with_graph(broken_graph)
            .activated();
        let broken_id = broken.id;

        store.insert_workflow(healthy);
        store.insert_workflow(broken);

        let event = event(tenant_id, "I need a human");
        let reports = engine(store.clone()).on_message(&event).await;
        assert_eq!(reports.len(), 2);

        let healthy_report = reports.iter().find(|r| r.workflow_id == healthy_id).unwrap();
        let broken_report = reports.iter().find(|r| r.workflow_id == broken_id).unwrap();
        assert!(healthy_report.success);
        assert!(!broken_report.success);

        assert_eq!(store.get_workflow(healthy_id).unwrap().counters.successes, 1);
        assert_eq!(store.get_workflow(broken_id).unwrap().counters.errors, 1);
        assert_eq!(store.contact_tags(event.contact_id), vec!["Human-Required"]);
    }
}
