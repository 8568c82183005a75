//! Node definition types.

use std::str::FromStr;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::ActionDef;
use super::condition::ConditionDef;
use super::trigger::TriggerDef;

/// Unique identifier for a node in a workflow graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Creates a new random node ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a node ID from an existing UUID.
    #[inline]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[inline]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

impl AsRef<Uuid> for NodeId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

/// A generic node wrapper that adds optional name and description to any inner type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCommon<T> {
    /// Display name of the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description of what this node does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inner node configuration.
    #[serde(flatten)]
    pub inner: T,
}

impl<T> NodeCommon<T> {
    /// Creates a new node with the given inner value.
    pub fn new(inner: T) -> Self {
        Self {
            name: None,
            description: None,
            inner,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A workflow node definition with common metadata.
pub type Node = NodeCommon<NodeKind>;

/// Node definition enum for workflow graphs.
///
/// Node kinds are a closed set, exhaustively matched by the validator,
/// compiler and evaluator. The action catalogue, by contrast, is open:
/// action nodes reference handlers by string key in the
/// [`crate::action::ActionRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry node identifying which platform event activates the workflow.
    Trigger(TriggerDef),
    /// Binary-branching predicate node with `true`/`false` outputs.
    Condition(ConditionDef),
    /// Side-effecting step node invoking a registered handler.
    Action(ActionDef),
}

impl NodeKind {
    /// Returns whether this is a trigger node.
    pub const fn is_trigger(&self) -> bool {
        matches!(self, NodeKind::Trigger(_))
    }

    /// Returns whether this is a condition node.
    pub const fn is_condition(&self) -> bool {
        matches!(self, NodeKind::Condition(_))
    }

    /// Returns whether this is an action node.
    pub const fn is_action(&self) -> bool {
        matches!(self, NodeKind::Action(_))
    }
}
