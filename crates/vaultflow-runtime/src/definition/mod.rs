//! Workflow definition types.
//!
//! This module contains serializable, editor-friendly types for defining
//! workflows. These types are designed for:
//! - Easy serialization to/from JSON
//! - Frontend consumption and editing
//! - Storage alongside the compiled form
//!
//! To execute a workflow, definitions must be validated with
//! [`crate::validate::GraphValidator`] and compiled with
//! [`crate::compile::WorkflowCompiler`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

mod action;
mod condition;
mod edge;
mod metadata;
mod node;
mod trigger;

pub use action::{ActionDef, RetryPolicy};
pub use condition::{CompareOp, ConditionDef};
pub use edge::{Edge, EdgeHandle};
pub use metadata::WorkflowMetadata;
pub use node::{Node, NodeCommon, NodeId, NodeKind};
pub use trigger::{EventType, FilterLogic, FilterRule, TriggerDef, TriggerFilter};

/// Serializable workflow definition.
///
/// This is the JSON-friendly representation of a workflow graph as the
/// editor produces it. `version` is bumped on every successful compile,
/// never on plain edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Nodes in the workflow, keyed by their ID.
    pub nodes: HashMap<NodeId, Node>,
    /// Edges connecting nodes.
    pub edges: Vec<Edge>,
    /// Monotonic version, incremented on every successful compile.
    #[serde(default)]
    pub version: u64,
    /// Workflow metadata.
    #[serde(default)]
    pub metadata: WorkflowMetadata,
}

impl WorkflowDefinition {
    /// Adds a node to the workflow.
    pub fn add_node(&mut self, id: NodeId, node: Node) -> &mut Self {
        self.nodes.insert(id, node);
        self
    }

    /// Adds an edge to the workflow.
    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Adds a simple edge on the implicit output handle.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Returns the trigger node, if the graph has exactly one.
    pub fn trigger(&self) -> Option<(&NodeId, &TriggerDef)> {
        let mut triggers = self.nodes.iter().filter_map(|(id, node)| match &node.inner {
            NodeKind::Trigger(def) => Some((id, def)),
            _ => None,
        });
        let first = triggers.next()?;
        if triggers.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Returns an iterator over trigger nodes.
    pub fn trigger_nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter().filter(|(_, node)| node.inner.is_trigger())
    }

    /// Returns an iterator over condition nodes.
    pub fn condition_nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.inner.is_condition())
    }

    /// Returns an iterator over action nodes.
    pub fn action_nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter().filter(|(_, node)| node.inner.is_action())
    }

    /// Returns the outgoing edges of a node, in insertion order.
    pub fn outgoing(&self, id: &NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.source == *id)
    }
}

/// Lifecycle status of a workflow.
///
/// Only [`WorkflowStatus::Active`] workflows are eligible for dispatch.
/// Pausing takes effect for future dispatches only; in-flight runs are
/// allowed to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Editable, never dispatched.
    #[default]
    Draft,
    /// Eligible for dispatch.
    Active,
    /// Temporarily ineligible; compiled form is retained.
    Paused,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn test_node_id(n: u128) -> NodeId {
        Uuid::from_u128(n).into()
    }

    fn trigger_node(event_type: EventType) -> Node {
        Node::new(NodeKind::Trigger(TriggerDef {
            event_type,
            filter: None,
        }))
    }

    fn action_node(action_type: &str) -> Node {
        Node::new(NodeKind::Action(ActionDef::new(action_type)))
    }

    #[test]
    fn test_workflow_definition_default() {
        let def = WorkflowDefinition::default();
        assert!(def.nodes.is_empty());
        assert!(def.edges.is_empty());
        assert_eq!(def.version, 0);
    }

    #[test]
    fn test_workflow_definition_connect() {
        let mut def = WorkflowDefinition::default();
        let id1 = test_node_id(1);
        let id2 = test_node_id(2);
        def.add_node(id1, trigger_node(EventType::OrderCreated))
            .add_node(id2, action_node("AUTO_APPROVE"))
            .connect(id1, id2);

        assert_eq!(def.edges.len(), 1);
        assert_eq!(def.edges[0].source, id1);
        assert_eq!(def.edges[0].target, id2);
        assert_eq!(def.edges[0].handle, EdgeHandle::Output);
    }

    #[test]
    fn test_workflow_definition_trigger_unique() {
        let mut def = WorkflowDefinition::default();
        let id1 = test_node_id(1);
        def.add_node(id1, trigger_node(EventType::OrderCreated));
        assert_eq!(def.trigger().map(|(id, _)| *id), Some(id1));

        def.add_node(test_node_id(2), trigger_node(EventType::KycSubmitted));
        assert!(def.trigger().is_none());
    }

    #[test]
    fn test_workflow_definition_serialization() {
        let mut def = WorkflowDefinition::default();
        let id1 = test_node_id(1);
        let id2 = test_node_id(2);
        def.add_node(id1, trigger_node(EventType::PayoutRequested))
            .add_node(id2, action_node("FREEZE_PAYOUT"))
            .connect(id1, id2);

        let json = serde_json::to_string(&def).expect("serialization failed");
        let deserialized: WorkflowDefinition =
            serde_json::from_str(&json).expect("deserialization failed");

        assert_eq!(def, deserialized);
    }

    #[test]
    fn test_workflow_status_serde_names() {
        let json = serde_json::to_string(&WorkflowStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
        let status: WorkflowStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(status, WorkflowStatus::Paused);
    }
}
