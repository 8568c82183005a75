//! Condition node types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// A condition node definition.
///
/// Resolves `field` as a dotted path into the event context and compares
/// it against `value`. Routing follows the `true`/`false` edge handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDef {
    /// Dotted path into the event context (e.g. `user.kycLevel`).
    pub field: String,
    /// Comparison operator.
    pub operator: CompareOp,
    /// Right-hand side: scalar, list or pattern depending on the operator.
    pub value: serde_json::Value,
}

/// The fixed comparison operator set.
///
/// Serialized with the editor's symbolic names (`==`, `>=`, `not_in`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, Serialize, Deserialize)]
pub enum CompareOp {
    /// Structural equality.
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Eq,
    /// Structural inequality. The only operator that is true against an
    /// unresolved field.
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    Ne,
    /// Numeric greater-than.
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    /// Numeric less-than.
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    /// Numeric greater-or-equal.
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Ge,
    /// Numeric less-or-equal.
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Le,
    /// Membership in a provided list.
    #[serde(rename = "in")]
    #[strum(serialize = "in")]
    In,
    /// Non-membership in a provided list.
    #[serde(rename = "not_in")]
    #[strum(serialize = "not_in")]
    NotIn,
    /// Substring (strings) or element membership (arrays).
    #[serde(rename = "contains")]
    #[strum(serialize = "contains")]
    Contains,
    /// Regular-expression match on strings.
    #[serde(rename = "matches")]
    #[strum(serialize = "matches")]
    Matches,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_symbolic_serde() {
        assert_eq!(serde_json::to_string(&CompareOp::Ge).unwrap(), "\">=\"");
        assert_eq!(
            serde_json::from_str::<CompareOp>("\"not_in\"").unwrap(),
            CompareOp::NotIn
        );
    }

    #[test]
    fn test_compare_op_display() {
        assert_eq!(CompareOp::Eq.to_string(), "==");
        assert_eq!(CompareOp::Contains.to_string(), "contains");
    }

    #[test]
    fn test_condition_def_deserialization() {
        let json = serde_json::json!({
            "field": "user.kycLevel",
            "operator": "in",
            "value": ["L1", "L2"]
        });
        let def: ConditionDef = serde_json::from_value(json).unwrap();
        assert_eq!(def.field, "user.kycLevel");
        assert_eq!(def.operator, CompareOp::In);
        assert!(def.value.is_array());
    }
}
