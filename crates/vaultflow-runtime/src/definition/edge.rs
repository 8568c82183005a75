//! Edge types for connecting nodes in a workflow graph.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::NodeId;

/// An edge connecting two nodes in the workflow graph.
///
/// Field names follow the editor document: `sourceNodeId`,
/// `targetNodeId`, `sourceHandle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID.
    #[serde(rename = "sourceNodeId")]
    pub source: NodeId,
    /// Target node ID.
    #[serde(rename = "targetNodeId")]
    pub target: NodeId,
    /// Handle on the source node this edge leaves from.
    #[serde(rename = "sourceHandle", default)]
    pub handle: EdgeHandle,
}

impl Edge {
    /// Creates a new edge on the implicit output handle.
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            handle: EdgeHandle::Output,
        }
    }

    /// Creates an edge leaving a specific handle.
    pub fn with_handle(source: NodeId, target: NodeId, handle: EdgeHandle) -> Self {
        Self {
            source,
            target,
            handle,
        }
    }
}

/// Output handle on a source node.
///
/// Condition nodes expose `true` and `false`; trigger and action nodes
/// expose the single implicit `output` handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EdgeHandle {
    /// The single implicit handle of trigger and action nodes.
    #[default]
    Output,
    /// Condition true branch.
    True,
    /// Condition false branch.
    False,
}
