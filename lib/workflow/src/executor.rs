//! Workflow executor.
//!
//! Walks the node graph sequentially from the trigger node, running one
//! handler at a time, persisting the audit log incrementally, and
//! bumping the workflow's counters when the run ends. Execution is
//! fault-contained: whatever happens inside a run, the caller gets an
//! [`ExecutionReport`] back, never an error.

use crate::context::{ExecutionContext, InboundMessage};
use crate::definition::Workflow;
use crate::error::ExecutionError;
use crate::execution::{ExecutionLog, ExecutionStep, StepStatus, TriggerSnapshot};
use crate::handler::{HandlerOutcome, NodeHandlers};
use crate::store::{EngineStore, RunOutcome};
use chrono::Utc;
use inboxflow_core::{ExecutionId, WorkflowId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Limits applied to every run.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Maximum nodes a single run may execute.
    pub max_steps: u32,
    /// Wall-clock budget for a single node.
    pub node_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            node_timeout: Duration::from_secs(30),
        }
    }
}

/// Summary of one finished run, returned to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The run's log ID.
    pub execution_id: ExecutionId,
    /// The workflow that ran.
    pub workflow_id: WorkflowId,
    /// Whether the run completed.
    pub success: bool,
    /// Number of node steps taken.
    pub steps: usize,
    /// Error message for a failed run.
    pub error: Option<String>,
}

/// Runs a single workflow against a single inbound message.
pub struct Executor {
    handlers: Arc<NodeHandlers>,
    store: Arc<dyn EngineStore>,
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor with default limits.
    #[must_use]
    pub fn new(handlers: Arc<NodeHandlers>, store: Arc<dyn EngineStore>) -> Self {
        Self {
            handlers,
            store,
            config: ExecutorConfig::default(),
        }
    }

    /// Overrides the run limits.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Executes `workflow` for `event`, walking the graph until a
    /// terminal node, a halting condition, a failure, or the step
    /// ceiling.
    pub async fn execute(&self, workflow: &Workflow, event: &InboundMessage) -> ExecutionReport {
        let mut context = ExecutionContext::from_event(event);
        let mut log = ExecutionLog::start(
            workflow.id,
            workflow.name.clone(),
            event.tenant_id,
            event.conversation_id,
            TriggerSnapshot {
                message_id: event.message_id,
                contact_id: event.contact_id,
                channel: event.channel,
                content: event.content.clone(),
            },
        );
        if let Err(error) = self.store.insert_execution(&log).await {
            warn!(%error, "failed to insert execution log");
        }

        let Some(trigger) = workflow.graph.trigger_node() else {
            let error = ExecutionError::MissingTriggerNode.to_string();
            log.fail(error.clone());
            if let Err(store_error) = self.store.update_execution(&log).await {
                warn!(error = %store_error, "failed to update execution log");
            }
            return self.finish(workflow, &log, Some(error)).await;
        };

        let mut current_id = trigger.id;
        let mut failure: Option<String> = None;

        loop {
            if log.step_count() as u32 >= self.config.max_steps {
                failure = Some(
                    ExecutionError::StepLimitExceeded {
                        limit: self.config.max_steps,
                    }
                    .to_string(),
                );
                break;
            }

            // The walk only follows edges between existing nodes, so a
            // missing current node means the graph was mutated mid-run.
            let Some(node) = workflow.graph.get_node(current_id) else {
                failure = Some(format!("node {current_id} disappeared from graph"));
                break;
            };

            let started_at = Utc::now();
            let outcome = match tokio::time::timeout(
                self.config.node_timeout,
                self.handlers.handle(node, &mut context, workflow),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => HandlerOutcome::Failed {
                    error: format!(
                        "node timed out after {}s",
                        self.config.node_timeout.as_secs()
                    ),
                },
            };

            let (status, output, error) = match &outcome {
                HandlerOutcome::Completed { output } => {
                    (StepStatus::Completed, output.clone(), None)
                }
                HandlerOutcome::Halted { output } => (StepStatus::Halted, output.clone(), None),
                HandlerOutcome::Failed { error } => {
                    (StepStatus::Failed, None, Some(error.clone()))
                }
            };
            log.record_step(ExecutionStep {
                node_id: node.id,
                kind: node.kind(),
                label: node.label.clone(),
                status,
                output,
                error,
                started_at,
                finished_at: Utc::now(),
            });
            if let Err(store_error) = self.store.update_execution(&log).await {
                warn!(error = %store_error, "failed to update execution log");
            }

            match outcome {
                HandlerOutcome::Completed { .. } => match workflow.graph.next_after(current_id) {
                    Some(next) => current_id = next.id,
                    None => break,
                },
                HandlerOutcome::Halted { .. } => break,
                HandlerOutcome::Failed { error } => {
                    failure = Some(
                        ExecutionError::NodeFailed {
                            node_id: current_id,
                            reason: error,
                        }
                        .to_string(),
                    );
                    break;
                }
            }
        }

        match &failure {
            Some(error) => log.fail(error.clone()),
            None => log.complete(),
        }
        if let Err(store_error) = self.store.update_execution(&log).await {
            warn!(error = %store_error, "failed to update execution log");
        }

        self.finish(workflow, &log, failure).await
    }

    async fn finish(
        &self,
        workflow: &Workflow,
        log: &ExecutionLog,
        error: Option<String>,
    ) -> ExecutionReport {
        let outcome = if error.is_none() {
            RunOutcome::Success
        } else {
            RunOutcome::Failure
        };
        if let Err(store_error) = self
            .store
            .record_outcome(workflow.id, outcome, Utc::now())
            .await
        {
            warn!(workflow_id = %workflow.id, error = %store_error, "failed to record run outcome");
        }

        info!(
            workflow_id = %workflow.id,
            execution_id = %log.id,
            steps = log.step_count(),
            duration_ms = log.duration_ms(),
            success = error.is_none(),
            "workflow run finished"
        );

        ExecutionReport {
            execution_id: log.id,
            workflow_id: workflow.id,
            success: error.is_none(),
            steps: log.step_count(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::execution::ExecutionStatus;
    use crate::graph::WorkflowGraph;
    use crate::node::{ActionConfig, ConditionConfig, Node, NodeConfig};
    use crate::store::InMemoryStore;
    use crate::trigger::TriggerSpec;
    use async_trait::async_trait;
    use inboxflow_ai::{AiError, MockReplyBackend, ReplyBackend, ReplyRequest, ReplyResponse};
    use inboxflow_channel::{ChannelRouter, RecordingSender};
    use inboxflow_conversation::{Channel, ContactSnapshot};
    use inboxflow_core::{ContactId, ConversationId, MessageId, TenantId};

    /// A backend that never answers, for exercising the node timeout.
    struct StalledBackend;

    #[async_trait]
    impl ReplyBackend for StalledBackend {
        async fn generate(&self, _request: &ReplyRequest) -> Result<ReplyResponse, AiError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AiError::Timeout)
        }
    }

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

    fn executor_with(store: Arc<InMemoryStore>, backend: Arc<dyn ReplyBackend>) -> Executor {
        let channels = ChannelRouter::new().with_whatsapp(Arc::new(RecordingSender::new()));
        let handlers = Arc::new(NodeHandlers::new(backend, channels, store.clone()));
        Executor::new(handlers, store)
    }

    fn executor(store: Arc<InMemoryStore>) -> Executor {
        executor_with(store, Arc::new(MockReplyBackend::replying("Sure!")))
    }

    fn stored_workflow(store: &InMemoryStore, workflow: Workflow) -> Workflow {
        store.insert_workflow(workflow.clone());
        workflow
    }

    fn keyword_condition(keyword: &str) -> NodeConfig {
        NodeConfig::Condition(ConditionConfig::MessageContains {
            keyword: keyword.to_string(),
        })
    }

    fn add_tag(tag: &str) -> NodeConfig {
        NodeConfig::Action(ActionConfig::AddTag {
            tag: tag.to_string(),
        })
    }

    fn linear_graph(configs: Vec<NodeConfig>) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        let mut previous = None;
        for (i, config) in configs.into_iter().enumerate() {
            let id = graph.add_node(Node::new(format!("node {i}"), config));
            if let Some(prev) = previous {
                graph.add_edge(Edge::new(prev, id)).unwrap();
            }
            previous = Some(id);
        }
        graph
    }

    #[tokio::test]
    async fn linear_run_completes_and_counts() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![
            NodeConfig::Trigger,
            keyword_condition("human"),
            add_tag("Human-Required"),
        ]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Escalation", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let event = event(tenant_id, "I need a human");
        let report = executor(store.clone()).execute(&workflow, &event).await;

        assert!(report.success);
        assert_eq!(report.steps, 3);
        assert_eq!(store.contact_tags(event.contact_id), vec!["Human-Required"]);

        let logs = store.executions_for_workflow(workflow.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, ExecutionStatus::Completed);
        assert_eq!(logs[0].steps.len(), 3);

        let stored = store.get_workflow(workflow.id).unwrap();
        assert_eq!(stored.counters.executions, 1);
        assert_eq!(stored.counters.successes, 1);
        assert_eq!(stored.counters.errors, 0);
    }

    #[tokio::test]
    async fn condition_false_completes_after_two_steps() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![
            NodeConfig::Trigger,
            keyword_condition("price"),
            add_tag("pricing-lead"),
        ]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Pricing", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let event = event(tenant_id, "hello");
        let report = executor(store.clone()).execute(&workflow, &event).await;

        assert!(report.success);
        assert_eq!(report.steps, 2);
        assert!(store.contact_tags(event.contact_id).is_empty());

        let logs = store.executions_for_workflow(workflow.id).await.unwrap();
        assert_eq!(logs[0].steps[1].status, StepStatus::Halted);
    }

    #[tokio::test]
    async fn missing_trigger_fails_with_zero_steps() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![add_tag("lead")]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Broken", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let event = event(tenant_id, "hello");
        let report = executor(store.clone()).execute(&workflow, &event).await;

        assert!(!report.success);
        assert_eq!(report.steps, 0);
        assert!(report.error.as_deref().unwrap().contains("no trigger node"));

        let logs = store.executions_for_workflow(workflow.id).await.unwrap();
        assert_eq!(logs[0].status, ExecutionStatus::Failed);

        let stored = store.get_workflow(workflow.id).unwrap();
        assert_eq!(stored.counters.errors, 1);
    }

    #[tokio::test]
    async fn cyclic_graph_hits_step_ceiling() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();

        let mut graph = WorkflowGraph::new();
        let trigger_id = graph.add_node(Node::new("Trigger", NodeConfig::Trigger));
        let loop_id = graph.add_node(Node::new("Loop", add_tag("looped")));
        graph.add_edge(Edge::new(trigger_id, loop_id)).unwrap();
        graph.add_edge(Edge::new(loop_id, loop_id)).unwrap();

        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Cyclic", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let event = event(tenant_id, "hello");
        let report = executor(store.clone())
            .with_config(ExecutorConfig {
                max_steps: 5,
                node_timeout: Duration::from_secs(30),
            })
            .execute(&workflow, &event)
            .await;

        assert!(!report.success);
        assert_eq!(report.steps, 5);
        assert!(report.error.as_deref().unwrap().contains("step limit"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_node_times_out_and_fails_run() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![
            NodeConfig::Trigger,
            NodeConfig::AiReply {
                system_prompt: None,
            },
        ]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Slow responder", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let event = event(tenant_id, "hello");
        let report = executor_with(store.clone(), Arc::new(StalledBackend))
            .with_config(ExecutorConfig {
                max_steps: 50,
                node_timeout: Duration::from_secs(1),
            })
            .execute(&workflow, &event)
            .await;

        assert!(!report.success);
        assert_eq!(report.steps, 2);
        assert!(report.error.as_deref().unwrap().contains("timed out"));

        let logs = store.executions_for_workflow(workflow.id).await.unwrap();
        assert_eq!(logs[0].status, ExecutionStatus::Failed);
        assert_eq!(logs[0].steps[1].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn failed_node_fails_run_and_stops_walk() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![
            NodeConfig::Trigger,
            NodeConfig::SendTemplate {
                body: "Welcome!".to_string(),
            },
            add_tag("welcomed"),
        ]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Welcome", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        // No phone number, so the WhatsApp send fails.
        let mut event = event(tenant_id, "hello");
        event.contact = ContactSnapshot::new("Dana").with_instagram_id("dana.ig");

        let report = executor(store.clone()).execute(&workflow, &event).await;

        assert!(!report.success);
        assert_eq!(report.steps, 2);
        assert!(report.error.as_deref().unwrap().contains("no phone number"));
        assert!(store.contact_tags(event.contact_id).is_empty());
    }

    #[tokio::test]
    async fn reruns_are_independent() {
        let store = Arc::new(InMemoryStore::new());
        let tenant_id = TenantId::new();
        let graph = linear_graph(vec![NodeConfig::Trigger, add_tag("seen")]);
        let workflow = stored_workflow(
            &store,
            Workflow::new(tenant_id, "Rerun", TriggerSpec::new_message())
                .with_graph(graph)
                .activated(),
        );

        let executor = executor(store.clone());
        let first = executor.execute(&workflow, &event(tenant_id, "one")).await;
        let second = executor.execute(&workflow, &event(tenant_id, "two")).await;

        assert!(first.success && second.success);
        assert_ne!(first.execution_id, second.execution_id);

        let logs = store.executions_for_workflow(workflow.id).await.unwrap();
        assert_eq!(logs.len(), 2);

        let stored = store.get_workflow(workflow.id).unwrap();
        assert_eq!(stored.counters.executions, 2);
        assert_eq!(stored.counters.successes, 2);
    }
}
