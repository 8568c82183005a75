//! Execution traces.
//!
//! Every dispatch of a compiled workflow produces one [`ExecutionTrace`]
//! recording which nodes ran, in what order, with what result. Traces
//! are written once at the end of a run and never mutated.

use std::str::FromStr;

use derive_more::{Debug, Display, From, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};
use uuid::Uuid;

use crate::definition::NodeId;
use crate::event::Event;
use crate::store::WorkflowId;

/// Unique identifier for an execution trace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Creates a new random trace ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a trace ID from an existing UUID.
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

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Record of a single workflow run against a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    /// Trace identity.
    pub trace_id: TraceId,
    /// Workflow that ran.
    pub workflow_id: WorkflowId,
    /// Version of the compiled form that ran.
    pub workflow_version: u64,
    /// The event that triggered the run.
    pub event: Event,
    /// When the run started.
    pub started_at: Timestamp,
    /// Per-node results, in execution order.
    pub results: Vec<NodeResult>,
    /// Overall outcome.
    pub outcome: TraceOutcome,
}

impl ExecutionTrace {
    /// Returns whether the run completed without an aborting failure.
    pub fn completed(&self) -> bool {
        self.outcome == TraceOutcome::Completed
    }

    /// Returns the result for a node, if it was reached.
    pub fn result_for(&self, node_id: NodeId) -> Option<&NodeResult> {
        self.results.iter().find(|result| result.node_id == node_id)
    }
}

/// Result of one node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    /// The node that ran.
    pub node_id: NodeId,
    /// Terminal status of the node.
    pub status: NodeStatus,
    /// When the node started.
    pub started_at: Timestamp,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Handler output on success, or branch verdict for conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Failure message on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeResult {
    /// Records a successful node.
    pub fn success(
        node_id: NodeId,
        started_at: Timestamp,
        duration_ms: u64,
        output: serde_json::Value,
    ) -> Self {
        Self {
            node_id,
            status: NodeStatus::Success,
            started_at,
            duration_ms,
            output: Some(output),
            error: None,
        }
    }

    /// Records a failed node.
    pub fn error(
        node_id: NodeId,
        started_at: Timestamp,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            status: NodeStatus::Error,
            started_at,
            duration_ms,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Records a node skipped because an earlier step aborted the run.
    pub fn skipped(node_id: NodeId, at: Timestamp) -> Self {
        Self {
            node_id,
            status: NodeStatus::Skipped,
            started_at: at,
            duration_ms: 0,
            output: None,
            error: None,
        }
    }
}

/// Terminal status of a node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, StrumDisplay, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// The node ran and succeeded.
    Success,
    /// The node ran and failed (after exhausting retries).
    Error,
    /// The node was never run because an earlier step aborted.
    Skipped,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, StrumDisplay, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceOutcome {
    /// Every reached node either succeeded or failed with
    /// continue-on-error set.
    Completed,
    /// A step failed and aborted the remainder of its branch.
    Failed,
}
