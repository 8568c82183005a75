//! Runtime service facade.
//!
//! [`RuntimeService`] ties the stores, validator, compiler, evaluator and
//! dispatcher together behind one handle; transport layers (HTTP, CLI)
//! talk only to this type.

use std::sync::Arc;

use jiff::Timestamp;

use crate::TRACING_TARGET;
use crate::action::ActionRegistry;
use crate::compile::{CompiledWorkflow, WorkflowCompiler};
use crate::definition::{WorkflowDefinition, WorkflowStatus};
use crate::dispatch::{DispatchSummary, DispatcherConfig, TriggerDispatcher};
use crate::error::{Error, Result};
use crate::eval::{Evaluator, EvaluatorConfig};
use crate::event::Event;
use crate::store::{
    ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, WorkflowId, WorkflowRecord,
    WorkflowStore,
};
use crate::trace::{ExecutionTrace, TraceId};
use crate::validate::GraphValidator;

/// Result of a compile attempt.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// Validation passed and the workflow was compiled; the record now
    /// carries the new version and compiled form.
    Compiled {
        /// The updated record.
        record: WorkflowRecord,
    },
    /// Validation failed; nothing was persisted.
    Invalid {
        /// One message per violation, in deterministic order.
        errors: Vec<String>,
    },
}

/// The workflow engine's front door.
pub struct RuntimeService {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    registry: Arc<ActionRegistry>,
    compiler: WorkflowCompiler,
    dispatcher: TriggerDispatcher,
}

impl RuntimeService {
    /// Creates a service backed by in-memory stores and default tuning.
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self::with_stores(
            registry,
            Arc::new(InMemoryWorkflowStore::new()),
            Arc::new(InMemoryExecutionStore::new()),
            EvaluatorConfig::default(),
            DispatcherConfig::default(),
        )
    }

    /// Creates a service with explicit stores and tuning.
    pub fn with_stores(
        registry: Arc<ActionRegistry>,
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        evaluator_config: EvaluatorConfig,
        dispatcher_config: DispatcherConfig,
    ) -> Self {
        let evaluator = Evaluator::with_config(Arc::clone(&registry), evaluator_config);
        let dispatcher = TriggerDispatcher::with_config(
            Arc::clone(&workflows),
            Arc::clone(&executions),
            evaluator,
            dispatcher_config,
        );
        Self {
            workflows,
            executions,
            registry,
            compiler: WorkflowCompiler::new(),
            dispatcher,
        }
    }

    /// Returns the action registry.
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Stores a new workflow as a draft.
    pub fn create_workflow(&self, definition: WorkflowDefinition) -> Result<WorkflowRecord> {
        let mut record = WorkflowRecord::new(definition);
        if record.definition.metadata.created_at.is_none() {
            record.definition.metadata.created_at = Some(Timestamp::now());
        }
        self.workflows.insert(record.clone())?;
        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %record.id,
            "workflow created",
        );
        Ok(record)
    }

    /// Fetches a workflow by id.
    pub fn get_workflow(&self, id: WorkflowId) -> Result<WorkflowRecord> {
        self.workflows.get(id)?.ok_or(Error::WorkflowNotFound(id))
    }

    /// Returns all stored workflows.
    pub fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        self.workflows.list()
    }

    /// Replaces a workflow's definition.
    ///
    /// Editing never touches the compiled form or the version; those
    /// only move on a successful [`RuntimeService::compile_workflow`].
    pub fn update_definition(
        &self,
        id: WorkflowId,
        mut definition: WorkflowDefinition,
    ) -> Result<WorkflowRecord> {
        let mut record = self.get_workflow(id)?;
        definition.version = record.definition.version;
        definition.metadata.updated_at = Some(Timestamp::now());
        record.definition = definition;
        self.workflows.update(record.clone())?;
        Ok(record)
    }

    /// Sets a workflow's dispatch priority.
    pub fn set_priority(&self, id: WorkflowId, priority: i32) -> Result<WorkflowRecord> {
        let mut record = self.get_workflow(id)?;
        record.priority = priority;
        self.workflows.update(record.clone())?;
        Ok(record)
    }

    /// Validates and compiles a workflow.
    ///
    /// On success the definition's version is bumped and the new
    /// compiled form persisted atomically with it. A failed validation
    /// changes nothing.
    pub fn compile_workflow(&self, id: WorkflowId) -> Result<CompileOutcome> {
        let mut record = self.get_workflow(id)?;

        let report = GraphValidator::new(&self.registry).validate(&record.definition);
        if !report.is_valid() {
            tracing::info!(
                target: TRACING_TARGET,
                workflow_id = %id,
                errors = report.errors().len(),
                "workflow failed validation",
            );
            return Ok(CompileOutcome::Invalid {
                errors: report.messages(),
            });
        }

        let version = record.definition.version + 1;
        let compiled = self.compiler.compile(id, version, &record.definition)?;
        record.definition.version = version;
        record.definition.metadata.updated_at = Some(Timestamp::now());
        record.compiled = Some(compiled);
        self.workflows.update(record.clone())?;

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %id,
            version,
            "workflow compiled",
        );
        Ok(CompileOutcome::Compiled { record })
    }

    /// Changes a workflow's lifecycle status.
    ///
    /// Activation requires a compiled form. Pausing keeps the compiled
    /// form and affects future dispatches only.
    pub fn set_status(&self, id: WorkflowId, status: WorkflowStatus) -> Result<WorkflowRecord> {
        let mut record = self.get_workflow(id)?;
        if status == WorkflowStatus::Active && record.compiled.is_none() {
            return Err(Error::NotCompiled(id));
        }
        record.status = status;
        self.workflows.update(record.clone())?;
        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %id,
            status = %status,
            "workflow status changed",
        );
        Ok(record)
    }

    /// Returns a workflow's compiled form.
    pub fn compiled_workflow(&self, id: WorkflowId) -> Result<CompiledWorkflow> {
        self.get_workflow(id)?
            .compiled
            .ok_or(Error::NotCompiled(id))
    }

    /// Ingests a platform event, starting background runs for matching
    /// workflows.
    pub async fn on_event(&self, event: Event) -> Result<DispatchSummary> {
        self.dispatcher.on_event(event).await
    }

    /// Fetches an execution trace by id.
    pub fn trace(&self, trace_id: TraceId) -> Result<Option<ExecutionTrace>> {
        self.executions.get(trace_id)
    }

    /// Returns all traces for a workflow, oldest first.
    pub fn traces_for(&self, workflow_id: WorkflowId) -> Result<Vec<ExecutionTrace>> {
        self.executions.for_workflow(workflow_id)
    }

    /// Waits for in-flight runs without cancelling them.
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    /// Cancels in-flight runs and waits for them to stop.
    pub async fn shutdown(&self) {
        tracing::info!(target: TRACING_TARGET, "runtime service shutting down");
        self.dispatcher.shutdown().await;
    }
}

impl std::fmt::Debug for RuntimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::action::testing::NoopAction;
    use crate::definition::{
        ActionDef, EventType, Node, NodeId, NodeKind, TriggerDef,
    };

    fn service() -> RuntimeService {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(NoopAction::new("AUTO_APPROVE")));
        RuntimeService::new(Arc::new(registry))
    }

    fn valid_definition() -> WorkflowDefinition {
        let mut def = WorkflowDefinition::default();
        let trigger = NodeId::new();
        let action = NodeId::new();
        def.add_node(
            trigger,
            Node::new(NodeKind::Trigger(TriggerDef {
                event_type: EventType::OrderCreated,
                filter: None,
            })),
        )
        .add_node(action, Node::new(NodeKind::Action(ActionDef::new("AUTO_APPROVE"))))
        .connect(trigger, action);
        def
    }

    #[tokio::test]
    async fn test_create_compile_activate_dispatch() {
        let service = service();
        let record = service.create_workflow(valid_definition()).unwrap();
        assert_eq!(record.status, WorkflowStatus::Draft);
        assert_eq!(record.definition.version, 0);

        let outcome = service.compile_workflow(record.id).unwrap();
        let CompileOutcome::Compiled { record } = outcome else {
            panic!("expected successful compile");
        };
        assert_eq!(record.definition.version, 1);
        assert!(record.compiled.is_some());

        service.set_status(record.id, WorkflowStatus::Active).unwrap();

        let event = Event::new(EventType::OrderCreated, "order-1", 1, json!({}));
        let summary = service.on_event(event).await.unwrap();
        assert_eq!(summary.dispatched, vec![record.id]);
        service.drain().await;

        let traces = service.traces_for(record.id).unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces[0].completed());
        assert_eq!(traces[0].workflow_version, 1);
    }

    #[test]
    fn test_activation_requires_compiled_form() {
        let service = service();
        let record = service.create_workflow(valid_definition()).unwrap();
        assert!(matches!(
            service.set_status(record.id, WorkflowStatus::Active),
            Err(Error::NotCompiled(_))
        ));
    }

    #[test]
    fn test_invalid_workflow_is_not_compiled_and_version_unchanged() {
        let service = service();
        // No trigger node.
        let mut def = WorkflowDefinition::default();
        def.add_node(
            NodeId::new(),
            Node::new(NodeKind::Action(ActionDef::new("AUTO_APPROVE"))),
        );
        let record = service.create_workflow(def).unwrap();

        let outcome = service.compile_workflow(record.id).unwrap();
        let CompileOutcome::Invalid { errors } = outcome else {
            panic!("expected validation failure");
        };
        assert!(!errors.is_empty());

        let record = service.get_workflow(record.id).unwrap();
        assert_eq!(record.definition.version, 0);
        assert!(record.compiled.is_none());
    }

    #[test]
    fn test_update_definition_keeps_version_and_compiled_form() {
        let service = service();
        let record = service.create_workflow(valid_definition()).unwrap();
        service.compile_workflow(record.id).unwrap();

        service
            .update_definition(record.id, valid_definition())
            .unwrap();
        let record = service.get_workflow(record.id).unwrap();
        assert_eq!(record.definition.version, 1);
        assert!(record.compiled.is_some());
    }

    #[tokio::test]
    async fn test_branch_routes_large_orders_to_review() {
        let mut registry = ActionRegistry::new();
        let approve = Arc::new(NoopAction::new("AUTO_APPROVE"));
        let review = Arc::new(NoopAction::new("REQUIRE_APPROVAL"));
        let (approve_calls, review_calls) = (approve.calls(), review.calls());
        registry.register(approve);
        registry.register(review);
        let service = RuntimeService::new(Arc::new(registry));

        let mut def = WorkflowDefinition::default();
        let (trigger, condition, review_node, approve_node) =
            (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        def.add_node(
            trigger,
            Node::new(NodeKind::Trigger(TriggerDef {
                event_type: EventType::OrderCreated,
                filter: None,
            })),
        )
        .add_node(
            condition,
            Node::new(NodeKind::Condition(crate::definition::ConditionDef {
                field: "amount".into(),
                operator: crate::definition::CompareOp::Gt,
                value: json!(1000),
            })),
        )
        .add_node(
            review_node,
            Node::new(NodeKind::Action(ActionDef::new("REQUIRE_APPROVAL"))),
        )
        .add_node(
            approve_node,
            Node::new(NodeKind::Action(ActionDef::new("AUTO_APPROVE"))),
        )
        .connect(trigger, condition)
        .add_edge(crate::definition::Edge::with_handle(
            condition,
            review_node,
            crate::definition::EdgeHandle::True,
        ))
        .add_edge(crate::definition::Edge::with_handle(
            condition,
            approve_node,
            crate::definition::EdgeHandle::False,
        ));

        let record = service.create_workflow(def).unwrap();
        service.compile_workflow(record.id).unwrap();
        service.set_status(record.id, WorkflowStatus::Active).unwrap();

        let large = Event::new(EventType::OrderCreated, "order-1", 1, json!({ "amount": 5000 }));
        let small = Event::new(EventType::OrderCreated, "order-2", 1, json!({ "amount": 100 }));
        service.on_event(large).await.unwrap();
        service.on_event(small).await.unwrap();
        service.drain().await;

        use std::sync::atomic::Ordering;
        assert_eq!(review_calls.load(Ordering::SeqCst), 1);
        assert_eq!(approve_calls.load(Ordering::SeqCst), 1);

        let traces = service.traces_for(record.id).unwrap();
        assert_eq!(traces.len(), 2);
        assert!(traces.iter().all(|trace| trace.completed()));
    }

    #[test]
    fn test_get_unknown_workflow_errors() {
        let service = service();
        assert!(matches!(
            service.get_workflow(WorkflowId::new()),
            Err(Error::WorkflowNotFound(_))
        ));
    }
}
