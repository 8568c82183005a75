//! Compiled-workflow evaluation.
//!
//! [`compare`] implements the operator semantics shared by condition
//! branches and trigger filters; [`Evaluator`] walks a compiled tree
//! against one event and produces an [`crate::trace::ExecutionTrace`].

mod evaluator;
mod operator;

pub use evaluator::{Evaluator, EvaluatorConfig, EvaluatorConfigBuilder};
pub use operator::{EvalError, compare};

/// Tracing target for evaluation.
pub const TRACING_TARGET: &str = "vaultflow_runtime::eval";
