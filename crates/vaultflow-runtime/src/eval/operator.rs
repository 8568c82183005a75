//! Comparison operator semantics.

use serde_json::Value;

use crate::definition::CompareOp;
use crate::event::Resolved;

/// A predicate that could not be evaluated.
///
/// An `EvalError` is not "false": conditions route it to the false
/// branch, while trigger filters treat it as a non-match, and both log
/// it, so a typo in a rule never silently inverts routing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A numeric operator was applied to a non-numeric operand.
    #[error("operator `{operator}` requires numeric operands")]
    NonNumeric {
        /// The operator.
        operator: CompareOp,
    },
    /// `in`/`not_in` was given a non-array right-hand side.
    #[error("operator `{operator}` requires an array right-hand side")]
    NotAnArray {
        /// The operator.
        operator: CompareOp,
    },
    /// `matches` was given an invalid pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(String),
}

/// Evaluates `lhs <op> rhs`, where `lhs` came from the event context.
///
/// An unresolved left-hand side is false under every operator except
/// `!=`; a present JSON `null` compares structurally like any other
/// value.
pub fn compare(op: CompareOp, lhs: Resolved<'_>, rhs: &Value) -> Result<bool, EvalError> {
    let Some(lhs) = lhs.value() else {
        return Ok(op == CompareOp::Ne);
    };

    match op {
        CompareOp::Eq => Ok(lhs == rhs),
        CompareOp::Ne => Ok(lhs != rhs),
        CompareOp::Gt => numeric(op, lhs, rhs).map(|(l, r)| l > r),
        CompareOp::Lt => numeric(op, lhs, rhs).map(|(l, r)| l < r),
        CompareOp::Ge => numeric(op, lhs, rhs).map(|(l, r)| l >= r),
        CompareOp::Le => numeric(op, lhs, rhs).map(|(l, r)| l <= r),
        CompareOp::In => membership(op, lhs, rhs),
        CompareOp::NotIn => membership(op, lhs, rhs).map(|found| !found),
        CompareOp::Contains => Ok(contains(lhs, rhs)),
        CompareOp::Matches => matches_pattern(lhs, rhs),
    }
}

fn numeric(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64), EvalError> {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(EvalError::NonNumeric { operator: op }),
    }
}

fn membership(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let Some(items) = rhs.as_array() else {
        return Err(EvalError::NotAnArray { operator: op });
    };
    Ok(items.contains(lhs))
}

/// Substring for string lhs, element membership for array lhs, false for
/// anything else.
fn contains(lhs: &Value, rhs: &Value) -> bool {
    match lhs {
        Value::String(s) => rhs.as_str().is_some_and(|needle| s.contains(needle)),
        Value::Array(items) => items.contains(rhs),
        _ => false,
    }
}

fn matches_pattern(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let Some(pattern) = rhs.as_str() else {
        return Err(EvalError::InvalidPattern("pattern must be a string".into()));
    };
    let regex =
        regex::Regex::new(pattern).map_err(|e| EvalError::InvalidPattern(e.to_string()))?;
    Ok(lhs.as_str().is_some_and(|s| regex.is_match(s)))
}
