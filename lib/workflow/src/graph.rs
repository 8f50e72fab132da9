//! Workflow graph implementation using petgraph.
//!
//! Workflows are directed graphs where nodes are typed automation steps
//! and edges point from a step to the step that runs after it.
//!
//! The graph structure is stored as JSONB in the database for flexible
//! schema evolution.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::Node;
use inboxflow_core::NodeId;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A workflow graph using petgraph's directed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// The underlying directed graph.
    #[serde(with = "graph_serde")]
    graph: DiGraph<Node, Edge>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    #[serde(skip)]
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index_map: HashMap::new(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// Returns the node ID.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let node_id = node.id;
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        node_id
    }

    /// Removes a node from the graph.
    ///
    /// Also removes all edges connected to this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let index = self.node_index_map.remove(&node_id)?;
        let removed = self.graph.remove_node(index);
        // petgraph swaps the last node into the removed slot, which
        // invalidates stored indices.
        self.rebuild_index_map();
        removed
    }

    /// Returns a reference to a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Adds an edge between two nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the source or target node doesn't exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let source_index = self
            .node_index_map
            .get(&edge.source)
            .ok_or(GraphError::NodeNotFound {
                node_id: edge.source,
            })?;

        let target_index = self
            .node_index_map
            .get(&edge.target)
            .ok_or(GraphError::NodeNotFound {
                node_id: edge.target,
            })?;

        self.graph.add_edge(*source_index, *target_index, edge);
        Ok(())
    }

    /// Returns all nodes in the graph, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the trigger node, where every run starts.
    ///
    /// If the graph holds more than one trigger node the first in
    /// insertion order wins; [`validate`](Self::validate) rejects that
    /// shape before a workflow is saved.
    #[must_use]
    pub fn trigger_node(&self) -> Option<&Node> {
        self.nodes().find(|node| node.is_trigger())
    }

    /// Returns the node that runs after the given one.
    ///
    /// When a node has several outgoing edges the earliest-added edge
    /// wins, so the walk is deterministic for a given stored graph.
    /// Returns `None` for terminal nodes and unknown IDs.
    #[must_use]
    pub fn next_after(&self, node_id: NodeId) -> Option<&Node> {
        let &index = self.node_index_map.get(&node_id)?;

        let next = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .min_by_key(|edge| edge.id())?
            .target();

        self.graph.node_weight(next)
    }

    /// Validates the workflow graph.
    ///
    /// Checks that the graph holds exactly one trigger node.
    ///
    /// # Errors
    ///
    /// Returns an error describing the validation failure.
    pub fn validate(&self) -> Result<(), GraphError> {
        let trigger_count = self.nodes().filter(|node| node.is_trigger()).count();

        match trigger_count {
            0 => Err(GraphError::MissingTriggerNode),
            1 => Ok(()),
            count => Err(GraphError::MultipleTriggerNodes { count }),
        }
    }

    /// Rebuilds the node index map after deserialization.
    pub fn rebuild_index_map(&mut self) {
        self.node_index_map.clear();
        for index in self.graph.node_indices() {
            if let Some(node) = self.graph.node_weight(index) {
                self.node_index_map.insert(node.id, index);
            }
        }
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom serde for petgraph DiGraph.
///
/// Edges carry their endpoint IDs, so the wire shape is a plain
/// `{ "nodes": [...], "edges": [...] }` document.
mod graph_serde {
    use super::*;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeStruct;

    pub fn serialize<S>(graph: &DiGraph<Node, Edge>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let nodes: Vec<_> = graph.node_weights().cloned().collect();
        let edges: Vec<_> = graph.edge_references().map(|e| *e.weight()).collect();

        let mut state = serializer.serialize_struct("Graph", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DiGraph<Node, Edge>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct GraphVisitor;

        impl<'de> Visitor<'de> for GraphVisitor {
            type Value = DiGraph<Node, Edge>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a workflow graph with nodes and edges")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut nodes: Option<Vec<Node>> = None;
                let mut edges: Option<Vec<Edge>> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "nodes" => nodes = Some(map.next_value()?),
                        "edges" => edges = Some(map.next_value()?),
                        _ => {
                            let _ = map.next_value::<serde::de::IgnoredAny>()?;
                        }
                    }
                }

                let nodes = nodes.unwrap_or_default();
                let edges = edges.unwrap_or_default();

                let mut graph = DiGraph::new();
                let mut id_to_index = HashMap::new();

                for node in nodes {
                    let id = node.id;
                    let index = graph.add_node(node);
                    id_to_index.insert(id, index);
                }

                for edge in edges {
                    let (Some(&source_idx), Some(&target_idx)) =
                        (id_to_index.get(&edge.source), id_to_index.get(&edge.target))
                    else {
                        // Dangling edges are dropped rather than failing the
                        // whole document.
                        continue;
                    };
                    graph.add_edge(source_idx, target_idx, edge);
                }

                Ok(graph)
            }
        }

        deserializer.deserialize_struct("Graph", &["nodes", "edges"], GraphVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionConfig, NodeConfig};

    fn trigger_node(label: &str) -> Node {
        Node::new(label, NodeConfig::Trigger)
    }

    fn tag_node(label: &str, tag: &str) -> Node {
        Node::new(
            label,
            NodeConfig::Action(ActionConfig::AddTag {
                tag: tag.to_string(),
            }),
        )
    }

    #[test]
    fn add_and_get_node() {
        let mut graph = WorkflowGraph::new();
        let node = trigger_node("New message");
        let node_id = node.id;
        graph.add_node(node);

        let retrieved = graph.get_node(node_id);
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().label, "New message");
    }

    #[test]
    fn add_edge_rejects_missing_node() {
        let mut graph = WorkflowGraph::new();
        let trigger = trigger_node("Trigger");
        let trigger_id = graph.add_node(trigger);

        let result = graph.add_edge(Edge::new(trigger_id, NodeId::new()));
        assert!(matches!(result, Err(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn trigger_node_found_by_kind() {
        let mut graph = WorkflowGraph::new();
        graph.add_node(tag_node("Tag", "vip"));
        let trigger_id = graph.add_node(trigger_node("Trigger"));

        let trigger = graph.trigger_node().expect("trigger node");
        assert_eq!(trigger.id, trigger_id);
    }

    #[test]
    fn next_after_follows_first_added_edge() {
        let mut graph = WorkflowGraph::new();
        let trigger_id = graph.add_node(trigger_node("Trigger"));
        let first_id = graph.add_node(tag_node("First", "a"));
        let second_id = graph.add_node(tag_node("Second", "b"));

        graph.add_edge(Edge::new(trigger_id, first_id)).unwrap();
        graph.add_edge(Edge::new(trigger_id, second_id)).unwrap();

        let next = graph.next_after(trigger_id).expect("next node");
        assert_eq!(next.id, first_id);
    }

    #[test]
    fn next_after_terminal_is_none() {
        let mut graph = WorkflowGraph::new();
        let trigger_id = graph.add_node(trigger_node("Trigger"));
        assert!(graph.next_after(trigger_id).is_none());
    }

    #[test]
    fn validate_requires_exactly_one_trigger() {
        let mut graph = WorkflowGraph::new();
        graph.add_node(tag_node("Tag", "vip"));
        assert!(matches!(
            graph.validate(),
            Err(GraphError::MissingTriggerNode)
        ));

        graph.add_node(trigger_node("Trigger"));
        assert!(graph.validate().is_ok());

        graph.add_node(trigger_node("Another trigger"));
        assert!(matches!(
            graph.validate(),
            Err(GraphError::MultipleTriggerNodes { count: 2 })
        ));
    }

    #[test]
    fn graph_serde_roundtrip() {
        let mut graph = WorkflowGraph::new();
        let trigger_id = graph.add_node(trigger_node("Trigger"));
        let tag_id = graph.add_node(tag_node("Tag", "vip"));
        graph.add_edge(Edge::new(trigger_id, tag_id)).unwrap();

        let json = serde_json::to_string(&graph).expect("serialize");
        let mut parsed: WorkflowGraph = serde_json::from_str(&json).expect("deserialize");
        parsed.rebuild_index_map();

        assert_eq!(parsed.node_count(), 2);
        assert_eq!(parsed.edge_count(), 1);
        assert!(parsed.get_node(trigger_id).is_some());
        assert_eq!(parsed.next_after(trigger_id).unwrap().id, tag_id);
    }
}
