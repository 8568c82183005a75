//! Workflow and execution persistence.
//!
//! Storage is behind traits so the in-memory implementations here can be
//! swapped for a database-backed pair without touching the engine. The
//! execution store is append-only: traces are never mutated after a run
//! completes.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compile::CompiledWorkflow;
use crate::definition::{WorkflowDefinition, WorkflowStatus};
use crate::error::{Error, Result};
use crate::trace::{ExecutionTrace, TraceId};

/// Unique identifier for a stored workflow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    /// Creates a new random workflow ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a workflow ID from an existing UUID.
    #[inline]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[inline]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for WorkflowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A stored workflow: editable definition plus its compiled form.
///
/// `compiled` is present only after at least one successful compile, and
/// always corresponds to `definition.version`. `priority` orders
/// dispatch when several workflows match one event; lower runs first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    /// Workflow identity.
    pub id: WorkflowId,
    /// The editable graph.
    pub definition: WorkflowDefinition,
    /// Executable form from the last successful compile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled: Option<CompiledWorkflow>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Dispatch ordering; lower runs first.
    #[serde(default)]
    pub priority: i32,
}

impl WorkflowRecord {
    /// Creates a draft record around a definition.
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            id: WorkflowId::new(),
            definition,
            compiled: None,
            status: WorkflowStatus::Draft,
            priority: 0,
        }
    }

    /// Sets the dispatch priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Storage for workflow records.
pub trait WorkflowStore: Send + Sync {
    /// Inserts a new record, replacing any record with the same id.
    fn insert(&self, record: WorkflowRecord) -> Result<()>;

    /// Fetches a record by id.
    fn get(&self, id: WorkflowId) -> Result<Option<WorkflowRecord>>;

    /// Updates an existing record.
    fn update(&self, record: WorkflowRecord) -> Result<()>;

    /// Returns all records.
    fn list(&self) -> Result<Vec<WorkflowRecord>>;

    /// Returns all records with [`WorkflowStatus::Active`].
    fn active(&self) -> Result<Vec<WorkflowRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| record.status == WorkflowStatus::Active)
            .collect())
    }
}

/// Append-only storage for execution traces.
pub trait ExecutionStore: Send + Sync {
    /// Appends a finished trace.
    fn append(&self, trace: ExecutionTrace) -> Result<()>;

    /// Fetches a trace by id.
    fn get(&self, trace_id: TraceId) -> Result<Option<ExecutionTrace>>;

    /// Returns all traces for a workflow, oldest first.
    fn for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<ExecutionTrace>>;
}

/// In-memory workflow store.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, WorkflowRecord>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn insert(&self, record: WorkflowRecord) -> Result<()> {
        write_lock(&self.workflows)?.insert(record.id, record);
        Ok(())
    }

    fn get(&self, id: WorkflowId) -> Result<Option<WorkflowRecord>> {
        Ok(read_lock(&self.workflows)?.get(&id).cloned())
    }

    fn update(&self, record: WorkflowRecord) -> Result<()> {
        let mut workflows = write_lock(&self.workflows)?;
        if !workflows.contains_key(&record.id) {
            return Err(Error::WorkflowNotFound(record.id));
        }
        workflows.insert(record.id, record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowRecord>> {
        let workflows = read_lock(&self.workflows)?;
        let mut records: Vec<WorkflowRecord> = workflows.values().cloned().collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

/// In-memory, append-only execution store.
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    traces: RwLock<Vec<ExecutionTrace>>,
}

impl InMemoryExecutionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn append(&self, trace: ExecutionTrace) -> Result<()> {
        write_lock(&self.traces)?.push(trace);
        Ok(())
    }

    fn get(&self, trace_id: TraceId) -> Result<Option<ExecutionTrace>> {
        Ok(read_lock(&self.traces)?
            .iter()
            .find(|trace| trace.trace_id == trace_id)
            .cloned())
    }

    fn for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<ExecutionTrace>> {
        Ok(read_lock(&self.traces)?
            .iter()
            .filter(|trace| trace.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| Error::Internal("store lock poisoned".into()))
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| Error::Internal("store lock poisoned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{EventType, Node, NodeId, NodeKind, TriggerDef};

    fn record() -> WorkflowRecord {
        let mut definition = WorkflowDefinition::default();
        definition.add_node(
            NodeId::new(),
            Node::new(NodeKind::Trigger(TriggerDef {
                event_type: EventType::OrderCreated,
                filter: None,
            })),
        );
        WorkflowRecord::new(definition)
    }

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryWorkflowStore::new();
        let record = record();
        let id = record.id;
        store.insert(record.clone()).unwrap();
        assert_eq!(store.get(id).unwrap(), Some(record));
    }

    #[test]
    fn test_update_missing_record_errors() {
        let store = InMemoryWorkflowStore::new();
        let record = record();
        assert!(matches!(
            store.update(record),
            Err(Error::WorkflowNotFound(_))
        ));
    }

    #[test]
    fn test_active_filters_by_status() {
        let store = InMemoryWorkflowStore::new();
        let draft = record();
        let mut active = record();
        active.status = WorkflowStatus::Active;
        let active_id = active.id;
        store.insert(draft).unwrap();
        store.insert(active).unwrap();

        let records = store.active().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, active_id);
    }
}
