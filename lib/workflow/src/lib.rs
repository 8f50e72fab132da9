//! Workflow engine for the inboxflow platform.
//!
//! This crate provides the core automation engine, including:
//!
//! - **Document Model**: workflow definitions with typed nodes, edges,
//!   trigger specifications, and lifetime counters
//! - **Trigger Matcher**: selects active workflows whose trigger matches
//!   an inbound message event
//! - **Executor**: walks the node graph sequentially from the trigger,
//!   one node at a time, with a step ceiling and per-run audit log
//! - **Node Handlers**: condition evaluation, contact/conversation
//!   mutations, AI replies, template sends, and outbound webhooks
//! - **Store abstraction**: the document-store surface the engine needs,
//!   with an in-memory implementation for tests and embedding

pub mod context;
pub mod definition;
pub mod edge;
pub mod engine;
pub mod error;
pub mod execution;
pub mod executor;
pub mod graph;
pub mod handler;
pub mod matcher;
pub mod node;
pub mod store;
pub mod trigger;

pub use context::{ExecutionContext, InboundMessage};
pub use definition::{Workflow, WorkflowCounters, WorkflowStatus};
pub use edge::Edge;
pub use engine::Engine;
pub use error::{ExecutionError, GraphError};
pub use execution::{ExecutionLog, ExecutionStatus, ExecutionStep, StepStatus, TriggerSnapshot};
pub use executor::{ExecutionReport, Executor, ExecutorConfig};
pub use graph::WorkflowGraph;
pub use handler::{HandlerOutcome, NodeHandlers};
pub use matcher::TriggerMatcher;
pub use node::{ActionConfig, ConditionConfig, Node, NodeConfig, NodeKind, Position};
pub use store::{EngineStore, InMemoryStore, RunOutcome, StoreError};
pub use trigger::{TriggerSpec, TriggerType};
