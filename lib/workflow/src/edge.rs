//! Edge types for workflow graphs.
//!
//! Edges define execution order: after a node completes, the walker
//! follows the first outgoing edge whose source is that node. A node with
//! no outgoing edge ends the run.

use inboxflow_core::NodeId;
use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The source node ID.
    pub source: NodeId,
    /// The target node ID.
    pub target: NodeId,
}

impl Edge {
    /// Creates a new edge.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_creation() {
        let source = NodeId::new();
        let target = NodeId::new();
        let edge = Edge::new(source, target);

        assert_eq!(edge.source, source);
        assert_eq!(edge.target, target);
    }

    #[test]
    fn edge_serde_roundtrip() {
        let edge = Edge::new(NodeId::new(), NodeId::new());
        let json = serde_json::to_string(&edge).expect("serialize");
        let parsed: Edge = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(edge, parsed);
    }
}
