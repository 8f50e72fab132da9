//! Error types for the workflow crate.

use inboxflow_core::NodeId;
use std::fmt;

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// The graph has no trigger node.
    MissingTriggerNode,
    /// The graph has more than one trigger node.
    MultipleTriggerNodes { count: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::MissingTriggerNode => write!(f, "workflow graph has no trigger node"),
            Self::MultipleTriggerNodes { count } => {
                write!(f, "workflow graph has {count} trigger nodes, expected exactly one")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors during workflow execution.
///
/// These become the error message on a failed run; the executor never
/// propagates them as panics or caller-visible exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The graph has no trigger node to start from.
    MissingTriggerNode,
    /// A node handler failed.
    NodeFailed { node_id: NodeId, reason: String },
    /// The walk exceeded the configured step ceiling.
    StepLimitExceeded { limit: u32 },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTriggerNode => write!(f, "workflow has no trigger node"),
            Self::NodeFailed { node_id, reason } => {
                write!(f, "node {node_id} failed: {reason}")
            }
            Self::StepLimitExceeded { limit } => {
                write!(f, "execution exceeded step limit of {limit}")
            }
        }
    }
}

impl std::error::Error for ExecutionError {}
