use crate::compile::CompileError;
use crate::store::WorkflowId;

/// Result type alias for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the runtime service and stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No workflow exists with the given id.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),
    /// The workflow has never been successfully compiled.
    #[error("workflow {0} has no compiled form")]
    NotCompiled(WorkflowId),
    /// Graph compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// JSON serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    /// Invariant violation inside the runtime.
    #[error("internal error: {0}")]
    Internal(String),
}
