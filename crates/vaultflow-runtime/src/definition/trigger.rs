//! Trigger node types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::condition::CompareOp;

/// Platform events a workflow can be triggered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A customer order was created.
    OrderCreated,
    /// An incoming payment was received.
    PayinReceived,
    /// A payout was requested.
    PayoutRequested,
    /// A KYC application was submitted.
    KycSubmitted,
    /// A new user registered.
    UserRegistered,
    /// A wallet was added to an account.
    WalletAdded,
    /// A configured amount threshold was crossed.
    AmountThreshold,
}

/// A trigger node definition.
///
/// Identifies which platform event activates the workflow, with an
/// optional pre-dispatch filter. Events that fail the filter are skipped
/// without creating an execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
    /// Event type this trigger listens for.
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    /// Optional filter evaluated against the event context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<TriggerFilter>,
}

/// A filter of one or more rules combined by a logic connective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFilter {
    /// How the rules are combined. Defaults to AND.
    #[serde(default)]
    pub logic: FilterLogic,
    /// The individual rules. An empty list matches every event.
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

/// A single field/operator/value rule inside a trigger filter.
///
/// Uses the same operator semantics as condition nodes; a rule that
/// errors during evaluation counts as a non-match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Dotted path into the event context.
    pub field: String,
    /// Comparison operator.
    pub operator: CompareOp,
    /// Right-hand side value.
    pub value: serde_json::Value,
}

/// Logic connective for combining filter rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterLogic {
    /// Every rule must match.
    #[default]
    And,
    /// At least one rule must match.
    Or,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_event_type_serde_names() {
        let json = serde_json::to_string(&EventType::KycSubmitted).unwrap();
        assert_eq!(json, "\"KYC_SUBMITTED\"");
        let parsed: EventType = serde_json::from_str("\"ORDER_CREATED\"").unwrap();
        assert_eq!(parsed, EventType::OrderCreated);
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            EventType::from_str("PAYOUT_REQUESTED").unwrap(),
            EventType::PayoutRequested
        );
        assert!(EventType::from_str("NOT_AN_EVENT").is_err());
    }

    #[test]
    fn test_trigger_filter_deserialization() {
        let json = serde_json::json!({
            "eventType": "ORDER_CREATED",
            "filter": {
                "logic": "OR",
                "rules": [
                    { "field": "amount", "operator": ">", "value": 1000 },
                    { "field": "currency", "operator": "==", "value": "BTC" }
                ]
            }
        });
        let trigger: TriggerDef = serde_json::from_value(json).unwrap();
        let filter = trigger.filter.expect("filter present");
        assert_eq!(filter.logic, FilterLogic::Or);
        assert_eq!(filter.rules.len(), 2);
        assert_eq!(filter.rules[0].operator, CompareOp::Gt);
    }

    #[test]
    fn test_trigger_filter_logic_defaults_to_and() {
        let json = serde_json::json!({ "rules": [] });
        let filter: TriggerFilter = serde_json::from_value(json).unwrap();
        assert_eq!(filter.logic, FilterLogic::And);
    }
}
