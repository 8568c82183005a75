//! Graph-to-tree compilation.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{ActionStep, Branch, CompiledNode, CompiledWorkflow, Sequence};
use crate::definition::{ActionDef, EdgeHandle, NodeId, NodeKind, WorkflowDefinition};
use crate::store::WorkflowId;

/// Compiles a validated [`WorkflowDefinition`] into a [`CompiledWorkflow`].
///
/// Compilation is deterministic: the same definition always produces the
/// same tree. Nodes are assembled successors-first along a reverse
/// topological order, so the pass is iterative and terminates on any
/// acyclic input. Fan-in (two branch arms converging on the same node)
/// is resolved by cloning the shared subtree into each arm, keeping the
/// output a strict tree. Consecutive action nodes fuse into a single
/// [`Sequence`].
///
/// The compiler re-checks only the structural facts it depends on
/// (single trigger, acyclicity, both condition branches wired); full
/// validation is [`crate::validate::GraphValidator`]'s job.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowCompiler;

impl WorkflowCompiler {
    /// Creates a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Compiles the definition, binding the output to `workflow_id` and
    /// `version`.
    pub fn compile(
        &self,
        workflow_id: WorkflowId,
        version: u64,
        definition: &WorkflowDefinition,
    ) -> Result<CompiledWorkflow, CompileError> {
        let trigger_count = definition.trigger_nodes().count();
        let Some((trigger_id, _)) = definition.trigger() else {
            return Err(CompileError::TriggerCount {
                found: trigger_count,
            });
        };
        let trigger_id = *trigger_id;

        let successors = successor_table(definition)?;
        let order = reverse_topological(definition)?;

        // Successors-first assembly: by the time a node is visited, every
        // node it points at is already in `compiled`.
        let mut compiled: HashMap<NodeId, CompiledNode> = HashMap::new();
        for id in order {
            let Some(node) = definition.nodes.get(&id) else {
                return Err(CompileError::UnknownNode { node: id });
            };
            match &node.inner {
                NodeKind::Trigger(_) => {}
                NodeKind::Condition(def) => {
                    let on_true = continuation(&compiled, &successors, id, EdgeHandle::True)?
                        .ok_or(CompileError::MissingBranch {
                            node: id,
                            handle: EdgeHandle::True,
                        })?;
                    let on_false = continuation(&compiled, &successors, id, EdgeHandle::False)?
                        .ok_or(CompileError::MissingBranch {
                            node: id,
                            handle: EdgeHandle::False,
                        })?;
                    compiled.insert(
                        id,
                        CompiledNode::Branch(Box::new(Branch {
                            node_id: id,
                            field: def.field.clone(),
                            operator: def.operator,
                            value: def.value.clone(),
                            on_true,
                            on_false,
                        })),
                    );
                }
                NodeKind::Action(def) => {
                    let step = action_step(id, def);
                    let next = continuation(&compiled, &successors, id, EdgeHandle::Output)?
                        .unwrap_or(CompiledNode::End);
                    // Fuse runs of consecutive actions into one sequence.
                    let sequence = match next {
                        CompiledNode::Sequence(mut sequence) => {
                            sequence.steps.insert(0, step);
                            sequence
                        }
                        other => Sequence {
                            steps: vec![step],
                            on_complete: Box::new(other),
                        },
                    };
                    compiled.insert(id, CompiledNode::Sequence(sequence));
                }
            }
        }

        let root = continuation(&compiled, &successors, trigger_id, EdgeHandle::Output)?
            .unwrap_or(CompiledNode::End);

        Ok(CompiledWorkflow {
            workflow_id,
            version,
            root,
        })
    }
}

/// Failure to compile a workflow graph.
///
/// These are structural defects the validator reports with more context;
/// the compiler re-checks them so it stays safe on unvalidated input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The graph does not have exactly one trigger node.
    #[error("workflow must have exactly one trigger node, found {found}")]
    TriggerCount {
        /// Number of trigger nodes present.
        found: usize,
    },
    /// The graph contains a cycle.
    #[error("workflow graph contains a cycle")]
    Cycle,
    /// A condition node lacks an outgoing branch.
    #[error("condition node {node} is missing its `{handle}` branch")]
    MissingBranch {
        /// The condition node.
        node: NodeId,
        /// The branch that is not wired.
        handle: EdgeHandle,
    },
    /// Two edges leave the same handle of the same node.
    #[error("duplicate outgoing `{handle}` edge on node {node}")]
    DuplicateHandle {
        /// The source node.
        node: NodeId,
        /// The contested handle.
        handle: EdgeHandle,
    },
    /// An edge references a node that is not in the graph, or points
    /// into a trigger.
    #[error("edge references unknown or non-executable node {node}")]
    UnknownNode {
        /// The offending node id.
        node: NodeId,
    },
}

fn action_step(id: NodeId, def: &ActionDef) -> ActionStep {
    ActionStep {
        node_id: id,
        action_type: def.action_type.clone(),
        config: def.config.clone(),
        continue_on_error: def.continue_on_error,
        timeout_ms: def.timeout_ms,
        retry: def.retry,
    }
}

/// Builds the `(source, handle) -> target` table, rejecting dangling
/// endpoints and duplicate handles.
fn successor_table(
    definition: &WorkflowDefinition,
) -> Result<HashMap<(NodeId, EdgeHandle), NodeId>, CompileError> {
    let mut successors = HashMap::new();
    for edge in &definition.edges {
        if !definition.nodes.contains_key(&edge.source) {
            return Err(CompileError::UnknownNode { node: edge.source });
        }
        if !definition.nodes.contains_key(&edge.target) {
            return Err(CompileError::UnknownNode { node: edge.target });
        }
        if successors
            .insert((edge.source, edge.handle), edge.target)
            .is_some()
        {
            return Err(CompileError::DuplicateHandle {
                node: edge.source,
                handle: edge.handle,
            });
        }
    }
    Ok(successors)
}

/// Returns the node ids in reverse topological order.
fn reverse_topological(definition: &WorkflowDefinition) -> Result<Vec<NodeId>, CompileError> {
    let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
    let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
    for id in definition.nodes.keys() {
        indices.insert(*id, graph.add_node(*id));
    }
    for edge in &definition.edges {
        if let (Some(&source), Some(&target)) =
            (indices.get(&edge.source), indices.get(&edge.target))
        {
            graph.add_edge(source, target, ());
        }
    }

    let mut order = toposort(&graph, None).map_err(|_| CompileError::Cycle)?;
    order.reverse();
    Ok(order.into_iter().map(|index| graph[index]).collect())
}

/// Looks up the already-compiled continuation behind `(node, handle)`.
///
/// `Ok(None)` means the handle has no outgoing edge. A wired edge whose
/// target has not been compiled can only mean the target is a trigger.
fn continuation(
    compiled: &HashMap<NodeId, CompiledNode>,
    successors: &HashMap<(NodeId, EdgeHandle), NodeId>,
    node: NodeId,
    handle: EdgeHandle,
) -> Result<Option<CompiledNode>, CompileError> {
    let Some(target) = successors.get(&(node, handle)) else {
        return Ok(None);
    };
    compiled
        .get(target)
        .cloned()
        .map(Some)
        .ok_or(CompileError::UnknownNode { node: *target })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::definition::{
        ActionDef, CompareOp, ConditionDef, Edge, EventType, Node, TriggerDef,
    };

    fn test_node_id(n: u128) -> NodeId {
        Uuid::from_u128(n).into()
    }

    fn trigger_node() -> Node {
        Node::new(NodeKind::Trigger(TriggerDef {
            event_type: EventType::OrderCreated,
            filter: None,
        }))
    }

    fn condition_node(field: &str) -> Node {
        Node::new(NodeKind::Condition(ConditionDef {
            field: field.into(),
            operator: CompareOp::Gt,
            value: json!(1000),
        }))
    }

    fn action_node(action_type: &str) -> Node {
        Node::new(NodeKind::Action(ActionDef::new(action_type)))
    }

    fn compile(definition: &WorkflowDefinition) -> Result<CompiledWorkflow, CompileError> {
        WorkflowCompiler::new().compile(WorkflowId::new(), 1, definition)
    }

    #[test]
    fn test_compile_trigger_only() {
        let mut def = WorkflowDefinition::default();
        def.add_node(test_node_id(1), trigger_node());

        let compiled = compile(&def).unwrap();
        assert!(compiled.root.is_end());
        assert_eq!(compiled.version, 1);
    }

    #[test]
    fn test_compile_fuses_consecutive_actions() {
        let mut def = WorkflowDefinition::default();
        let (t, a, b) = (test_node_id(1), test_node_id(2), test_node_id(3));
        def.add_node(t, trigger_node())
            .add_node(a, action_node("NOTIFY_OPS"))
            .add_node(b, action_node("AUTO_APPROVE"))
            .connect(t, a)
            .connect(a, b);

        let compiled = compile(&def).unwrap();
        let sequence = compiled.root.as_sequence().expect("root is a sequence");
        assert_eq!(sequence.steps.len(), 2);
        assert_eq!(sequence.steps[0].action_type, "NOTIFY_OPS");
        assert_eq!(sequence.steps[1].action_type, "AUTO_APPROVE");
        assert!(sequence.on_complete.is_end());
    }

    #[test]
    fn test_compile_branch_both_arms() {
        let mut def = WorkflowDefinition::default();
        let (t, c, a, b) = (
            test_node_id(1),
            test_node_id(2),
            test_node_id(3),
            test_node_id(4),
        );
        def.add_node(t, trigger_node())
            .add_node(c, condition_node("amount"))
            .add_node(a, action_node("REQUIRE_APPROVAL"))
            .add_node(b, action_node("AUTO_APPROVE"))
            .connect(t, c)
            .add_edge(Edge::with_handle(c, a, EdgeHandle::True))
            .add_edge(Edge::with_handle(c, b, EdgeHandle::False));

        let compiled = compile(&def).unwrap();
        let branch = compiled.root.as_branch().expect("root is a branch");
        assert_eq!(branch.node_id, c);
        assert_eq!(branch.field, "amount");
        assert_eq!(
            branch.on_true.as_sequence().unwrap().steps[0].action_type,
            "REQUIRE_APPROVAL"
        );
        assert_eq!(
            branch.on_false.as_sequence().unwrap().steps[0].action_type,
            "AUTO_APPROVE"
        );
    }

    #[test]
    fn test_compile_branch_arm_without_edge_errors() {
        let mut def = WorkflowDefinition::default();
        let (t, c, a) = (test_node_id(1), test_node_id(2), test_node_id(3));
        def.add_node(t, trigger_node())
            .add_node(c, condition_node("amount"))
            .add_node(a, action_node("AUTO_APPROVE"))
            .connect(t, c)
            .add_edge(Edge::with_handle(c, a, EdgeHandle::True));

        assert_eq!(
            compile(&def),
            Err(CompileError::MissingBranch {
                node: c,
                handle: EdgeHandle::False,
            })
        );
    }

    #[test]
    fn test_compile_fan_in_clones_subtree() {
        let mut def = WorkflowDefinition::default();
        let (t, c, shared) = (test_node_id(1), test_node_id(2), test_node_id(3));
        def.add_node(t, trigger_node())
            .add_node(c, condition_node("amount"))
            .add_node(shared, action_node("NOTIFY_OPS"))
            .connect(t, c)
            .add_edge(Edge::with_handle(c, shared, EdgeHandle::True))
            .add_edge(Edge::with_handle(c, shared, EdgeHandle::False));

        let compiled = compile(&def).unwrap();
        let branch = compiled.root.as_branch().unwrap();
        assert_eq!(branch.on_true, branch.on_false);
        assert_eq!(
            branch.on_true.as_sequence().unwrap().steps[0].node_id,
            shared
        );
    }

    #[test]
    fn test_compile_cycle_errors() {
        let mut def = WorkflowDefinition::default();
        let (t, a, b) = (test_node_id(1), test_node_id(2), test_node_id(3));
        def.add_node(t, trigger_node())
            .add_node(a, action_node("A"))
            .add_node(b, action_node("B"))
            .connect(t, a)
            .connect(a, b)
            .add_edge(Edge::with_handle(b, a, EdgeHandle::Output));

        assert_eq!(compile(&def), Err(CompileError::Cycle));
    }

    #[test]
    fn test_compile_duplicate_handle_errors() {
        let mut def = WorkflowDefinition::default();
        let (t, a, b) = (test_node_id(1), test_node_id(2), test_node_id(3));
        def.add_node(t, trigger_node())
            .add_node(a, action_node("A"))
            .add_node(b, action_node("B"))
            .connect(t, a)
            .connect(t, b);

        assert_eq!(
            compile(&def),
            Err(CompileError::DuplicateHandle {
                node: t,
                handle: EdgeHandle::Output,
            })
        );
    }

    #[test]
    fn test_compile_without_trigger_errors() {
        let mut def = WorkflowDefinition::default();
        def.add_node(test_node_id(1), action_node("A"));

        assert_eq!(compile(&def), Err(CompileError::TriggerCount { found: 0 }));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut def = WorkflowDefinition::default();
        let (t, c, a, b) = (
            test_node_id(1),
            test_node_id(2),
            test_node_id(3),
            test_node_id(4),
        );
        def.add_node(t, trigger_node())
            .add_node(c, condition_node("amount"))
            .add_node(a, action_node("REQUIRE_APPROVAL"))
            .add_node(b, action_node("AUTO_APPROVE"))
            .connect(t, c)
            .add_edge(Edge::with_handle(c, a, EdgeHandle::True))
            .add_edge(Edge::with_handle(c, b, EdgeHandle::False));

        let id = WorkflowId::new();
        let compiler = WorkflowCompiler::new();
        let first = compiler.compile(id, 1, &def).unwrap();
        let second = compiler.compile(id, 1, &def).unwrap();
        assert_eq!(first, second);
    }
}
