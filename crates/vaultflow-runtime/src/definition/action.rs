//! Action node types.

use serde::{Deserialize, Serialize};

/// An action node definition.
///
/// `action_type` is a key into the [`crate::action::ActionRegistry`];
/// `config` is opaque to the engine and validated by the registered
/// handler's own schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDef {
    /// Registry key of the handler to invoke.
    pub action_type: String,
    /// Handler-specific configuration.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Whether the sequence continues past a failure of this step.
    #[serde(default)]
    pub continue_on_error: bool,
    /// Per-step timeout override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Per-step retry override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

impl ActionDef {
    /// Creates an action definition with empty config.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            config: serde_json::Value::Null,
            continue_on_error: false,
            timeout_ms: None,
            retry: None,
        }
    }

    /// Sets the handler config.
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Sets the continue-on-error flag.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Bounded retry policy for a single action step.
///
/// Retries are local to the step; prior steps are never re-run. Backoff
/// is a fixed delay multiplied by the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first. Clamped to at least 1.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default)]
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Returns the attempt count, never less than 1.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
