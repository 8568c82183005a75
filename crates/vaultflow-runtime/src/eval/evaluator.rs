//! Compiled-tree walker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use derive_builder::Builder;
use jiff::Timestamp;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{TRACING_TARGET, compare};
use crate::action::{ActionError, ActionRegistry};
use crate::compile::{ActionStep, CompiledNode, CompiledWorkflow};
use crate::definition::RetryPolicy;
use crate::event::Event;
use crate::trace::{ExecutionTrace, NodeResult, TraceId, TraceOutcome};

/// Evaluator tuning.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct EvaluatorConfig {
    /// Timeout applied when neither the step nor the handler sets one.
    #[builder(default = "Duration::from_secs(30)")]
    pub default_timeout: Duration,
    /// Retry policy applied when neither the step nor the handler sets
    /// one.
    #[builder(default = "RetryPolicy::none()")]
    pub default_retry: RetryPolicy,
}

impl EvaluatorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.default_timeout {
            if timeout.is_zero() {
                return Err("default_timeout must be non-zero".to_string());
            }
        }
        Ok(())
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            default_retry: RetryPolicy::none(),
        }
    }
}

/// Walks a [`CompiledWorkflow`] against one event.
///
/// Evaluation is a straight tree walk with no graph traversal: branches
/// route to exactly one arm, sequences run their steps in order, and the
/// walk ends at [`CompiledNode::End`] or on an aborting step failure.
/// The same compiled tree and event always take the same path.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<ActionRegistry>,
    config: EvaluatorConfig,
}

impl Evaluator {
    /// Creates an evaluator with default tuning.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self::with_config(registry, EvaluatorConfig::default())
    }

    /// Creates an evaluator with explicit tuning.
    pub fn with_config(registry: Arc<ActionRegistry>, config: EvaluatorConfig) -> Self {
        Self { registry, config }
    }

    /// Runs the compiled workflow against the event, producing a trace.
    ///
    /// Never returns an error: every failure mode is recorded in the
    /// trace instead, so one bad step cannot take down the dispatcher.
    pub async fn evaluate(
        &self,
        compiled: &CompiledWorkflow,
        event: &Event,
        cancel: CancellationToken,
    ) -> ExecutionTrace {
        let started_at = Timestamp::now();
        let mut results = Vec::new();
        let mut outcome = TraceOutcome::Completed;
        let mut current = &compiled.root;

        'walk: loop {
            match current {
                CompiledNode::End => break,
                CompiledNode::Branch(branch) => {
                    let node_started = Timestamp::now();
                    let clock = Instant::now();
                    let lhs = event.resolve(&branch.field);
                    // An unevaluable predicate routes false rather than
                    // aborting the run.
                    let verdict = match compare(branch.operator, lhs, &branch.value) {
                        Ok(verdict) => {
                            results.push(NodeResult::success(
                                branch.node_id,
                                node_started,
                                elapsed_ms(clock),
                                json!({ "matched": verdict }),
                            ));
                            verdict
                        }
                        Err(e) => {
                            tracing::warn!(
                                target: TRACING_TARGET,
                                node_id = %branch.node_id,
                                error = %e,
                                "condition not evaluable, routing false",
                            );
                            results.push(NodeResult::error(
                                branch.node_id,
                                node_started,
                                elapsed_ms(clock),
                                e.to_string(),
                            ));
                            false
                        }
                    };
                    current = if verdict {
                        &branch.on_true
                    } else {
                        &branch.on_false
                    };
                }
                CompiledNode::Sequence(sequence) => {
                    for (index, step) in sequence.steps.iter().enumerate() {
                        let (result, succeeded) = self.run_step(step, event, &cancel).await;
                        results.push(result);
                        if !succeeded && !step.continue_on_error {
                            let now = Timestamp::now();
                            for remaining in &sequence.steps[index + 1..] {
                                results.push(NodeResult::skipped(remaining.node_id, now));
                            }
                            outcome = TraceOutcome::Failed;
                            break 'walk;
                        }
                    }
                    current = sequence.on_complete.as_ref();
                }
            }
        }

        ExecutionTrace {
            trace_id: TraceId::new(),
            workflow_id: compiled.workflow_id,
            workflow_version: compiled.version,
            event: event.clone(),
            started_at,
            results,
            outcome,
        }
    }

    /// Runs one action step with its timeout and retry policy.
    async fn run_step(
        &self,
        step: &ActionStep,
        event: &Event,
        cancel: &CancellationToken,
    ) -> (NodeResult, bool) {
        let node_started = Timestamp::now();
        let clock = Instant::now();

        let Some(handler) = self.registry.get(&step.action_type) else {
            return (
                NodeResult::error(
                    step.node_id,
                    node_started,
                    elapsed_ms(clock),
                    format!("unknown action type: {}", step.action_type),
                ),
                false,
            );
        };

        // Step override wins, then the handler's own config, then the
        // evaluator default.
        let timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .or_else(|| handler.timeout(&step.config))
            .unwrap_or(self.config.default_timeout);
        let retry = step
            .retry
            .or_else(|| handler.retry_policy(&step.config))
            .unwrap_or(self.config.default_retry);
        let attempts = retry.attempts();

        let mut last_error = ActionError::Failed("not attempted".to_string());
        for attempt in 1..=attempts {
            let attempt_result =
                tokio::time::timeout(timeout, handler.execute(&step.config, event, cancel.clone()))
                    .await;
            let error = match attempt_result {
                Ok(Ok(output)) => {
                    return (
                        NodeResult::success(
                            step.node_id,
                            node_started,
                            elapsed_ms(clock),
                            output,
                        ),
                        true,
                    );
                }
                Ok(Err(e)) => e,
                Err(_) => ActionError::Timeout,
            };

            tracing::warn!(
                target: TRACING_TARGET,
                node_id = %step.node_id,
                action_type = %step.action_type,
                attempt,
                attempts,
                error = %error,
                "action attempt failed",
            );

            let retryable = error.is_retryable();
            last_error = error;
            if !retryable {
                break;
            }
            if attempt < attempts && retry.backoff_ms > 0 {
                tokio::time::sleep(Duration::from_millis(retry.backoff_ms * u64::from(attempt)))
                    .await;
            }
        }

        (
            NodeResult::error(
                step.node_id,
                node_started,
                elapsed_ms(clock),
                last_error.to_string(),
            ),
            false,
        )
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}
