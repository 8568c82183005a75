//! Action handler boundary and registry.
//!
//! Action types are a closed catalogue only at configuration time: the
//! registry is an open, explicitly registered table, so the platform can
//! add handlers (freeze order, send email, call a payment provider)
//! without touching the engine. The engine sees handlers only through
//! [`ActionHandler`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::definition::RetryPolicy;
use crate::event::Event;

mod http;
mod registry;

#[doc(hidden)]
pub mod testing;

pub use http::{HttpAuth, HttpRequestAction, HttpRequestConfig};
pub use registry::ActionRegistry;

/// Tracing target for action execution.
pub const TRACING_TARGET: &str = "vaultflow_runtime::action";

/// Result type for action execution.
pub type ActionResult = Result<serde_json::Value, ActionError>;

/// A registered action implementation.
///
/// `validate_config` is pure and synchronous; `execute` may perform
/// network I/O and must honor the cancellation token. The evaluator
/// enforces the timeout around `execute`, so implementations do not need
/// their own outer deadline.
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    /// Registry key for this handler (e.g. `HTTP_REQUEST`).
    fn action_type(&self) -> &str;

    /// Validates an action node's config against this handler's schema.
    ///
    /// Returns one message per problem; an empty list means valid.
    fn validate_config(&self, config: &serde_json::Value) -> Vec<String>;

    /// Executes the action against the event context.
    async fn execute(
        &self,
        config: &serde_json::Value,
        event: &Event,
        cancel: CancellationToken,
    ) -> ActionResult;

    /// Handler-level timeout, consulted when the step has no override.
    ///
    /// Handlers may read their own config (e.g. `timeoutMs`). `None`
    /// falls through to the evaluator's default.
    fn timeout(&self, _config: &serde_json::Value) -> Option<Duration> {
        None
    }

    /// Handler-level retry policy, consulted when the step has no
    /// override.
    ///
    /// Handlers may read their own config (e.g. `retryOnFailure`).
    /// `None` falls through to the evaluator's default.
    fn retry_policy(&self, _config: &serde_json::Value) -> Option<RetryPolicy> {
        None
    }
}

/// Failure of a single handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The invocation exceeded its timeout.
    #[error("action timed out")]
    Timeout,
    /// The invocation was cancelled.
    #[error("action cancelled")]
    Cancelled,
    /// The handler rejected its config at execution time.
    #[error("invalid action config: {0}")]
    InvalidConfig(String),
    /// The handler ran and failed.
    #[error("action failed: {0}")]
    Failed(String),
}

impl ActionError {
    /// Whether a retry could plausibly succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Failed(_))
    }
}
