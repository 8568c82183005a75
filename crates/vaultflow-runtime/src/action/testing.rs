//! Test doubles for action handlers.
//!
//! Used by the engine's own tests; not part of the public catalogue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{ActionError, ActionHandler, ActionResult};
use crate::event::Event;

/// Handler that always succeeds and counts invocations.
#[derive(Debug)]
pub struct NoopAction {
    action_type: String,
    calls: Arc<AtomicU32>,
}

impl NoopAction {
    /// Creates a no-op handler with the given registry key.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns a shared view of the invocation counter.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ActionHandler for NoopAction {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    fn validate_config(&self, _config: &serde_json::Value) -> Vec<String> {
        Vec::new()
    }

    async fn execute(
        &self,
        _config: &serde_json::Value,
        _event: &Event,
        _cancel: CancellationToken,
    ) -> ActionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({ "ok": true }))
    }
}

/// Handler that fails the first `failures` invocations, then succeeds.
///
/// With `failures == u32::MAX` it always fails.
#[derive(Debug)]
pub struct FlakyAction {
    action_type: String,
    failures: u32,
    calls: Arc<AtomicU32>,
}

impl FlakyAction {
    /// Creates a handler failing the first `failures` calls.
    pub fn new(action_type: impl Into<String>, failures: u32) -> Self {
        Self {
            action_type: action_type.into(),
            failures,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Creates a handler that always fails.
    pub fn always_failing(action_type: impl Into<String>) -> Self {
        Self::new(action_type, u32::MAX)
    }

    /// Returns a shared view of the invocation counter.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ActionHandler for FlakyAction {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    fn validate_config(&self, _config: &serde_json::Value) -> Vec<String> {
        Vec::new()
    }

    async fn execute(
        &self,
        _config: &serde_json::Value,
        _event: &Event,
        _cancel: CancellationToken,
    ) -> ActionResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(ActionError::Failed("flaky failure".into()))
        } else {
            Ok(serde_json::json!({ "ok": true, "attempt": call + 1 }))
        }
    }
}

/// Handler that sleeps before succeeding, for timeout tests.
#[derive(Debug)]
pub struct SlowAction {
    action_type: String,
    delay: Duration,
}

impl SlowAction {
    /// Creates a handler sleeping for `delay` on each call.
    pub fn new(action_type: impl Into<String>, delay: Duration) -> Self {
        Self {
            action_type: action_type.into(),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl ActionHandler for SlowAction {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    fn validate_config(&self, _config: &serde_json::Value) -> Vec<String> {
        Vec::new()
    }

    async fn execute(
        &self,
        _config: &serde_json::Value,
        _event: &Event,
        cancel: CancellationToken,
    ) -> ActionResult {
        tokio::select! {
            _ = cancel.cancelled() => Err(ActionError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(serde_json::json!({ "ok": true })),
        }
    }
}
