//! Compiled workflow representation.
//!
//! A [`CompiledWorkflow`] is the executable form produced once per
//! successful save. It is a strict decision tree with no graph-traversal
//! ambiguity: every branch has both arms populated (possibly the no-op
//! [`CompiledNode::End`] terminal), and there are no back-edges or shared
//! subtrees by construction. The editable graph is never walked at
//! dispatch time.

use serde::{Deserialize, Serialize};

use crate::definition::{CompareOp, NodeId, RetryPolicy};
use crate::store::WorkflowId;

mod compiler;

pub use compiler::{CompileError, WorkflowCompiler};

/// A compiled, executable workflow.
///
/// Serializable so it can be persisted alongside the editable definition
/// and reloaded without recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledWorkflow {
    /// Identity of the workflow this was compiled from.
    pub workflow_id: WorkflowId,
    /// Definition version this compile produced.
    pub version: u64,
    /// Root of the decision tree: the trigger's outgoing branch.
    pub root: CompiledNode,
}

/// A node of the compiled decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompiledNode {
    /// A two-way branch compiled from a condition node.
    Branch(Box<Branch>),
    /// A run of consecutive action steps.
    Sequence(Sequence),
    /// No-op terminal.
    End,
}

impl CompiledNode {
    /// Returns whether this is the terminal node.
    pub const fn is_end(&self) -> bool {
        matches!(self, CompiledNode::End)
    }

    /// Returns the branch, if this node is one.
    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            CompiledNode::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    /// Returns the sequence, if this node is one.
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            CompiledNode::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }
}

/// A compiled condition: evaluate the predicate, then continue down
/// exactly one arm. Both arms are always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Condition node this was compiled from, for trace correlation.
    pub node_id: NodeId,
    /// Dotted path into the event context.
    pub field: String,
    /// Comparison operator.
    pub operator: CompareOp,
    /// Right-hand side value.
    pub value: serde_json::Value,
    /// Continuation when the predicate holds.
    pub on_true: CompiledNode,
    /// Continuation when the predicate does not hold.
    pub on_false: CompiledNode,
}

/// A compiled run of consecutive action nodes, in edge order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// The steps, executed strictly in order.
    pub steps: Vec<ActionStep>,
    /// Continuation after the last step.
    pub on_complete: Box<CompiledNode>,
}

/// A single compiled action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Action node this was compiled from, for trace correlation.
    pub node_id: NodeId,
    /// Registry key of the handler.
    pub action_type: String,
    /// Handler-specific configuration.
    pub config: serde_json::Value,
    /// Whether the sequence continues past a failure of this step.
    pub continue_on_error: bool,
    /// Per-step timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Per-step retry override.
    pub retry: Option<RetryPolicy>,
}
