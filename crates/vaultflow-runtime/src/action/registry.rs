//! Registry of action handlers.

use std::collections::HashMap;
use std::sync::Arc;

use super::ActionHandler;

/// Maps action-type keys to handler implementations.
///
/// Populated once at startup; the validator consults it so that a
/// workflow referencing an unregistered type can never be saved.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own action type.
    ///
    /// Re-registering a type replaces the previous handler.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> &mut Self {
        self.handlers
            .insert(handler.action_type().to_string(), handler);
        self
    }

    /// Looks up a handler by action type.
    pub fn get(&self, action_type: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(action_type)
    }

    /// Returns whether the action type is registered.
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Returns the registered action-type keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("ActionRegistry")
            .field("action_types", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::NoopAction;
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ActionRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(NoopAction::new("AUTO_APPROVE")));
        assert!(registry.contains("AUTO_APPROVE"));
        assert!(!registry.contains("REQUIRE_APPROVAL"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("AUTO_APPROVE").is_some());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(NoopAction::new("AUTO_APPROVE")));
        registry.register(Arc::new(NoopAction::new("AUTO_APPROVE")));
        assert_eq!(registry.len(), 1);
    }
}
