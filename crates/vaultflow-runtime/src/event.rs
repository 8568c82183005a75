//! Platform event ingress types and field resolution.

use serde::{Deserialize, Serialize};

use crate::definition::EventType;

/// A platform event delivered to the dispatcher.
///
/// `context` carries whatever fields downstream conditions may reference
/// (e.g. `amount`, `currency`, `user.kycLevel`), addressable by dotted
/// path. `(event_type, entity_id, event_version)` identifies the event
/// for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Which platform event occurred.
    pub event_type: EventType,
    /// Identifier of the affected entity (order id, user id, ...).
    pub entity_id: String,
    /// Monotonic version of the event for the entity.
    pub event_version: u64,
    /// Event payload, addressable by dotted path.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl Event {
    /// Creates an event with the given context.
    pub fn new(
        event_type: EventType,
        entity_id: impl Into<String>,
        event_version: u64,
        context: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            entity_id: entity_id.into(),
            event_version,
            context,
        }
    }

    /// Resolves a dotted path into the event context.
    pub fn resolve(&self, path: &str) -> Resolved<'_> {
        resolve_path(&self.context, path)
    }
}

/// Result of resolving a field path against an event context.
///
/// `Undefined` (missing path) is distinct from a present JSON `null`:
/// every comparison against `Undefined` is false except `!=`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The path resolved to a value (possibly `null`).
    Value(&'a serde_json::Value),
    /// The path does not exist in the context.
    Undefined,
}

impl<'a> Resolved<'a> {
    /// Returns the resolved value, if the path existed.
    pub fn value(&self) -> Option<&'a serde_json::Value> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Undefined => None,
        }
    }

    /// Returns whether the path was missing.
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Resolved::Undefined)
    }
}

/// Walks a dotted path into a JSON value.
///
/// Path segments index into objects by key; arrays and scalars terminate
/// resolution. An empty path resolves to the context itself.
pub fn resolve_path<'a>(context: &'a serde_json::Value, path: &str) -> Resolved<'a> {
    if path.is_empty() {
        return Resolved::Value(context);
    }

    let mut current = context;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Resolved::Undefined,
        }
    }
    Resolved::Value(current)
}
