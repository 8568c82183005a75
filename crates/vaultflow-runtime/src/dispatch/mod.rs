//! Event ingress and trigger dispatch.
//!
//! The dispatcher is the only component that looks at live events. For
//! each event it selects the active workflows whose trigger matches,
//! deduplicates redeliveries, and runs each match as its own task behind
//! a concurrency limit. Runs are isolated: a failing workflow produces a
//! failed trace and a log line, never an error on the ingress path.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use derive_builder::Builder;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::definition::{EventType, FilterLogic, TriggerFilter, WorkflowStatus};
use crate::error::{Error, Result};
use crate::eval::{Evaluator, compare};
use crate::event::Event;
use crate::store::{ExecutionStore, WorkflowId, WorkflowRecord, WorkflowStore};

/// Tracing target for dispatch.
pub const TRACING_TARGET: &str = "vaultflow_runtime::dispatch";

/// Dispatcher tuning.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct DispatcherConfig {
    /// Maximum number of workflow runs in flight at once.
    #[builder(default = "32")]
    pub max_concurrent_dispatches: usize,
    /// Number of `(event, workflow)` pairs remembered for deduplication.
    /// Oldest entries are evicted first.
    #[builder(default = "4096")]
    pub dedup_capacity: usize,
}

impl DispatcherConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_dispatches == Some(0) {
            return Err("max_concurrent_dispatches must be non-zero".to_string());
        }
        if self.dedup_capacity == Some(0) {
            return Err("dedup_capacity must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: 32,
            dedup_capacity: 4096,
        }
    }
}

/// What an event ingestion did, reported synchronously.
///
/// The runs themselves complete in the background; their traces land in
/// the execution store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Workflows whose runs were started, in dispatch order.
    pub dispatched: Vec<WorkflowId>,
    /// Workflows skipped because this exact event was already seen.
    pub deduplicated: Vec<WorkflowId>,
}

/// Routes platform events to matching active workflows.
pub struct TriggerDispatcher {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    evaluator: Evaluator,
    semaphore: Arc<Semaphore>,
    seen: Mutex<DedupSet>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TriggerDispatcher {
    /// Creates a dispatcher with default tuning.
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        evaluator: Evaluator,
    ) -> Self {
        Self::with_config(workflows, executions, evaluator, DispatcherConfig::default())
    }

    /// Creates a dispatcher with explicit tuning.
    pub fn with_config(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        evaluator: Evaluator,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            workflows,
            executions,
            evaluator,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_dispatches)),
            seen: Mutex::new(DedupSet::new(config.dedup_capacity)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Ingests one event: starts a background run for every matching
    /// active workflow and returns immediately.
    ///
    /// Matching workflows run in ascending `priority` order (ties broken
    /// by id), each as its own task, so one slow or failing workflow
    /// cannot stall the others.
    pub async fn on_event(&self, event: Event) -> Result<DispatchSummary> {
        let mut matched: Vec<WorkflowRecord> = self
            .workflows
            .active()?
            .into_iter()
            .filter(|record| Self::matches(record, &event))
            .collect();
        matched.sort_by_key(|record| (record.priority, record.id));

        let mut summary = DispatchSummary::default();
        for record in matched {
            if !self.mark_seen(&event, record.id)? {
                tracing::debug!(
                    target: TRACING_TARGET,
                    workflow_id = %record.id,
                    entity_id = %event.entity_id,
                    event_version = event.event_version,
                    "duplicate event delivery, skipping",
                );
                summary.deduplicated.push(record.id);
                continue;
            }
            // Matching requires a compiled form; re-checked here because
            // the filter only looked at the definition.
            let Some(compiled) = record.compiled else {
                continue;
            };

            summary.dispatched.push(record.id);
            let evaluator = self.evaluator.clone();
            let executions = Arc::clone(&self.executions);
            let semaphore = Arc::clone(&self.semaphore);
            let cancel = self.cancel.child_token();
            let event = event.clone();
            let workflow_id = record.id;

            self.tracker.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let trace = evaluator.evaluate(&compiled, &event, cancel).await;
                if !trace.completed() {
                    tracing::error!(
                        target: TRACING_TARGET,
                        workflow_id = %workflow_id,
                        trace_id = %trace.trace_id,
                        "workflow run failed",
                    );
                }
                if let Err(e) = executions.append(trace) {
                    tracing::error!(
                        target: TRACING_TARGET,
                        workflow_id = %workflow_id,
                        error = %e,
                        "failed to persist execution trace",
                    );
                }
            });
        }

        tracing::info!(
            target: TRACING_TARGET,
            event_type = %event.event_type,
            entity_id = %event.entity_id,
            dispatched = summary.dispatched.len(),
            deduplicated = summary.deduplicated.len(),
            "event dispatched",
        );
        Ok(summary)
    }

    /// Cancels in-flight runs and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Waits for all currently spawned runs to finish without
    /// cancelling them.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn matches(record: &WorkflowRecord, event: &Event) -> bool {
        if record.status != WorkflowStatus::Active || record.compiled.is_none() {
            return false;
        }
        let Some((_, trigger)) = record.definition.trigger() else {
            return false;
        };
        if trigger.event_type != event.event_type {
            return false;
        }
        match &trigger.filter {
            Some(filter) => filter_matches(filter, event),
            None => true,
        }
    }

    /// Returns false if this `(event, workflow)` pair was already
    /// dispatched recently.
    fn mark_seen(&self, event: &Event, workflow_id: WorkflowId) -> Result<bool> {
        let key = DedupKey {
            event_type: event.event_type,
            entity_id: event.entity_id.clone(),
            event_version: event.event_version,
            workflow_id,
        };
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| Error::Internal("dedup lock poisoned".into()))?;
        Ok(seen.insert(key))
    }
}

impl std::fmt::Debug for TriggerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerDispatcher")
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

/// Evaluates a trigger filter against an event.
///
/// A rule that cannot be evaluated counts as a non-match for that rule;
/// under `and` logic this vetoes the filter, under `or` it is simply not
/// a hit. An empty rule list matches everything.
pub fn filter_matches(filter: &TriggerFilter, event: &Event) -> bool {
    if filter.rules.is_empty() {
        return true;
    }
    let mut hits = filter.rules.iter().map(|rule| {
        let lhs = event.resolve(&rule.field);
        match compare(rule.operator, lhs, &rule.value) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    field = %rule.field,
                    error = %e,
                    "trigger filter rule not evaluable, treating as non-match",
                );
                false
            }
        }
    });
    match filter.logic {
        FilterLogic::And => hits.all(|hit| hit),
        FilterLogic::Or => hits.any(|hit| hit),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    event_type: EventType,
    entity_id: String,
    event_version: u64,
    workflow_id: WorkflowId,
}

/// Bounded first-in-first-out set of recently dispatched keys.
#[derive(Debug)]
struct DedupSet {
    capacity: usize,
    order: VecDeque<DedupKey>,
    seen: HashSet<DedupKey>,
}

impl DedupSet {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity.min(1024)),
            seen: HashSet::new(),
        }
    }

    /// Inserts the key, returning false if it was already present.
    fn insert(&mut self, key: DedupKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::action::testing::NoopAction;
    use crate::action::ActionRegistry;
    use crate::compile::WorkflowCompiler;
    use crate::definition::{
        ActionDef, CompareOp, FilterRule, Node, NodeId, NodeKind, TriggerDef, WorkflowDefinition,
    };
    use crate::store::{InMemoryExecutionStore, InMemoryWorkflowStore};

    fn definition(event_type: EventType, filter: Option<TriggerFilter>) -> WorkflowDefinition {
        let mut def = WorkflowDefinition::default();
        let trigger = NodeId::new();
        let action = NodeId::new();
        def.add_node(trigger, Node::new(NodeKind::Trigger(TriggerDef { event_type, filter })))
            .add_node(action, Node::new(NodeKind::Action(ActionDef::new("AUTO_APPROVE"))))
            .connect(trigger, action);
        def
    }

    fn active_record(definition: WorkflowDefinition, priority: i32) -> WorkflowRecord {
        let mut record = WorkflowRecord::new(definition).with_priority(priority);
        record.compiled = Some(
            WorkflowCompiler::new()
                .compile(record.id, 1, &record.definition)
                .unwrap(),
        );
        record.status = WorkflowStatus::Active;
        record
    }

    fn dispatcher(
        records: Vec<WorkflowRecord>,
    ) -> (TriggerDispatcher, Arc<InMemoryExecutionStore>) {
        let workflows = Arc::new(InMemoryWorkflowStore::new());
        for record in records {
            workflows.insert(record).unwrap();
        }
        let executions = Arc::new(InMemoryExecutionStore::new());
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(NoopAction::new("AUTO_APPROVE")));
        let evaluator = Evaluator::new(Arc::new(registry));
        let execution_store: Arc<dyn ExecutionStore> = executions.clone();
        let dispatcher = TriggerDispatcher::new(workflows, execution_store, evaluator);
        (dispatcher, executions)
    }

    fn order_event(version: u64) -> Event {
        Event::new(
            EventType::OrderCreated,
            "order-1",
            version,
            json!({ "amount": 5000, "currency": "BTC" }),
        )
    }

    #[tokio::test]
    async fn test_dispatch_writes_trace_for_matching_workflow() {
        let record = active_record(definition(EventType::OrderCreated, None), 0);
        let workflow_id = record.id;
        let (dispatcher, executions) = dispatcher(vec![record]);

        let summary = dispatcher.on_event(order_event(1)).await.unwrap();
        assert_eq!(summary.dispatched, vec![workflow_id]);
        dispatcher.drain().await;

        let traces = executions.for_workflow(workflow_id).unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces[0].completed());
    }

    #[tokio::test]
    async fn test_dispatch_ignores_other_event_types() {
        let record = active_record(definition(EventType::KycSubmitted, None), 0);
        let (dispatcher, _) = dispatcher(vec![record]);

        let summary = dispatcher.on_event(order_event(1)).await.unwrap();
        assert!(summary.dispatched.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_skips_paused_workflows() {
        let mut record = active_record(definition(EventType::OrderCreated, None), 0);
        record.status = WorkflowStatus::Paused;
        let (dispatcher, _) = dispatcher(vec![record]);

        let summary = dispatcher.on_event(order_event(1)).await.unwrap();
        assert!(summary.dispatched.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_orders_by_priority_then_id() {
        let low = active_record(definition(EventType::OrderCreated, None), 1);
        let high = active_record(definition(EventType::OrderCreated, None), 10);
        let (low_id, high_id) = (low.id, high.id);
        let (dispatcher, _) = dispatcher(vec![high, low]);

        let summary = dispatcher.on_event(order_event(1)).await.unwrap();
        assert_eq!(summary.dispatched, vec![low_id, high_id]);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_dispatched_once() {
        let record = active_record(definition(EventType::OrderCreated, None), 0);
        let workflow_id = record.id;
        let (dispatcher, executions) = dispatcher(vec![record]);

        let first = dispatcher.on_event(order_event(1)).await.unwrap();
        let second = dispatcher.on_event(order_event(1)).await.unwrap();
        dispatcher.drain().await;

        assert_eq!(first.dispatched, vec![workflow_id]);
        assert!(second.dispatched.is_empty());
        assert_eq!(second.deduplicated, vec![workflow_id]);
        assert_eq!(executions.for_workflow(workflow_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_event_version_is_not_a_duplicate() {
        let record = active_record(definition(EventType::OrderCreated, None), 0);
        let workflow_id = record.id;
        let (dispatcher, executions) = dispatcher(vec![record]);

        dispatcher.on_event(order_event(1)).await.unwrap();
        let second = dispatcher.on_event(order_event(2)).await.unwrap();
        dispatcher.drain().await;

        assert_eq!(second.dispatched, vec![workflow_id]);
        assert_eq!(executions.for_workflow(workflow_id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_trigger_filter_gates_dispatch() {
        let filter = TriggerFilter {
            logic: FilterLogic::And,
            rules: vec![FilterRule {
                field: "amount".into(),
                operator: CompareOp::Gt,
                value: json!(10_000),
            }],
        };
        let record = active_record(definition(EventType::OrderCreated, Some(filter)), 0);
        let (dispatcher, _) = dispatcher(vec![record]);

        let summary = dispatcher.on_event(order_event(1)).await.unwrap();
        assert!(summary.dispatched.is_empty());
    }

    #[test]
    fn test_filter_or_logic_matches_on_any_rule() {
        let filter = TriggerFilter {
            logic: FilterLogic::Or,
            rules: vec![
                FilterRule {
                    field: "amount".into(),
                    operator: CompareOp::Gt,
                    value: json!(10_000),
                },
                FilterRule {
                    field: "currency".into(),
                    operator: CompareOp::Eq,
                    value: json!("BTC"),
                },
            ],
        };
        assert!(filter_matches(&filter, &order_event(1)));
    }

    #[test]
    fn test_filter_unevaluable_rule_is_non_match() {
        let filter = TriggerFilter {
            logic: FilterLogic::And,
            rules: vec![FilterRule {
                field: "currency".into(),
                operator: CompareOp::Gt,
                value: json!(1),
            }],
        };
        assert!(!filter_matches(&filter, &order_event(1)));
    }

    #[test]
    fn test_filter_empty_rules_match_everything() {
        let filter = TriggerFilter {
            logic: FilterLogic::And,
            rules: vec![],
        };
        assert!(filter_matches(&filter, &order_event(1)));
    }

    #[test]
    fn test_dedup_set_evicts_oldest() {
        let mut set = DedupSet::new(2);
        let key = |n: u64| DedupKey {
            event_type: EventType::OrderCreated,
            entity_id: format!("order-{n}"),
            event_version: 1,
            workflow_id: WorkflowId::from_uuid(uuid::Uuid::from_u128(1)),
        };
        assert!(set.insert(key(1)));
        assert!(set.insert(key(2)));
        assert!(!set.insert(key(1)));
        assert!(set.insert(key(3)));
        // key(1) was evicted by key(3).
        assert!(set.insert(key(1)));
    }
}
