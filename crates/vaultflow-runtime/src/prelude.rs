//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use vaultflow_runtime::prelude::*;
//! ```

pub use crate::action::{ActionHandler, ActionRegistry, HttpRequestAction};
pub use crate::compile::{CompiledNode, CompiledWorkflow, WorkflowCompiler};
pub use crate::definition::{
    ActionDef, CompareOp, ConditionDef, Edge, EdgeHandle, EventType, Node, NodeId, NodeKind,
    RetryPolicy, TriggerDef, TriggerFilter, WorkflowDefinition, WorkflowStatus,
};
pub use crate::dispatch::{DispatchSummary, DispatcherConfig, TriggerDispatcher};
pub use crate::error::{Error, Result};
pub use crate::eval::{Evaluator, EvaluatorConfig};
pub use crate::event::Event;
pub use crate::service::{CompileOutcome, RuntimeService};
pub use crate::store::{
    ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, WorkflowId, WorkflowRecord,
    WorkflowStore,
};
pub use crate::trace::{ExecutionTrace, NodeStatus, TraceId, TraceOutcome};
pub use crate::validate::{GraphValidator, ValidationReport};
