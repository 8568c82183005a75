//! Structural validation of workflow definitions.
//!
//! The validator runs on every save attempt, before compilation. All
//! rules are checked independently and every violation is collected, so
//! the editor can surface the full list tied to specific nodes and edges.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::action::ActionRegistry;
use crate::definition::{EdgeHandle, NodeId, NodeKind, WorkflowDefinition};

/// Structural validator for workflow definitions.
///
/// A definition that fails validation is never compiled.
pub struct GraphValidator<'a> {
    registry: &'a ActionRegistry,
}

impl<'a> GraphValidator<'a> {
    /// Creates a validator backed by the given action registry.
    pub fn new(registry: &'a ActionRegistry) -> Self {
        Self { registry }
    }

    /// Validates a workflow definition, collecting every violation.
    pub fn validate(&self, def: &WorkflowDefinition) -> ValidationReport {
        let mut errors = Vec::new();

        self.check_trigger_count(def, &mut errors);
        self.check_edge_endpoints(def, &mut errors);
        self.check_handles(def, &mut errors);
        self.check_reachability(def, &mut errors);
        self.check_acyclic(def, &mut errors);
        self.check_action_types(def, &mut errors);

        ValidationReport { errors }
    }

    /// Rule 1: exactly one trigger node.
    fn check_trigger_count(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        let found = def.trigger_nodes().count();
        if found != 1 {
            errors.push(ValidationError::TriggerCount { found });
        }
    }

    /// Rule 5: every edge references existing node ids on both ends.
    fn check_edge_endpoints(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        for edge in &def.edges {
            if !def.nodes.contains_key(&edge.source) {
                errors.push(ValidationError::DanglingEdgeSource {
                    src: edge.source,
                    target: edge.target,
                });
            }
            if !def.nodes.contains_key(&edge.target) {
                errors.push(ValidationError::DanglingEdgeTarget {
                    src: edge.source,
                    target: edge.target,
                });
            }
        }
    }

    /// Rule 4 plus the strict-tree constraints: condition nodes carry
    /// exactly one `true` and one `false` edge; trigger and action nodes
    /// carry at most one `output` edge and nothing else; nothing targets
    /// the trigger.
    fn check_handles(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        let mut outgoing: HashMap<(NodeId, EdgeHandle), usize> = HashMap::new();
        for edge in &def.edges {
            if !def.nodes.contains_key(&edge.source) {
                continue;
            }
            *outgoing.entry((edge.source, edge.handle)).or_default() += 1;

            if let Some(target) = def.nodes.get(&edge.target) {
                if target.inner.is_trigger() {
                    errors.push(ValidationError::EdgeIntoTrigger {
                        src: edge.source,
                        target: edge.target,
                    });
                }
            }
        }

        let mut ids: Vec<&NodeId> = def.nodes.keys().collect();
        ids.sort();

        for id in ids {
            let node = &def.nodes[id];
            let count = |handle| outgoing.get(&(*id, handle)).copied().unwrap_or(0);

            match &node.inner {
                NodeKind::Condition(_) => {
                    for handle in [EdgeHandle::True, EdgeHandle::False] {
                        match count(handle) {
                            0 => errors.push(ValidationError::MissingHandle { node: *id, handle }),
                            1 => {}
                            found => errors.push(ValidationError::DuplicateHandle {
                                node: *id,
                                handle,
                                found,
                            }),
                        }
                    }
                    if count(EdgeHandle::Output) > 0 {
                        errors.push(ValidationError::InvalidHandle {
                            node: *id,
                            handle: EdgeHandle::Output,
                        });
                    }
                }
                NodeKind::Trigger(_) | NodeKind::Action(_) => {
                    for handle in [EdgeHandle::True, EdgeHandle::False] {
                        if count(handle) > 0 {
                            errors.push(ValidationError::InvalidHandle { node: *id, handle });
                        }
                    }
                    let found = count(EdgeHandle::Output);
                    if found > 1 {
                        errors.push(ValidationError::DuplicateHandle {
                            node: *id,
                            handle: EdgeHandle::Output,
                            found,
                        });
                    }
                }
            }
        }
    }

    /// Rule 2: every non-trigger node is reachable from the trigger.
    ///
    /// Skipped when the trigger is absent or ambiguous; rule 1 already
    /// reports that.
    fn check_reachability(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        let Some((trigger_id, _)) = def.trigger() else {
            return;
        };

        let mut visited = HashSet::from([*trigger_id]);
        let mut queue = VecDeque::from([*trigger_id]);
        while let Some(current) = queue.pop_front() {
            for edge in def.outgoing(&current) {
                if def.nodes.contains_key(&edge.target) && visited.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
        }

        let mut unreachable: Vec<NodeId> = def
            .nodes
            .keys()
            .filter(|id| !visited.contains(id))
            .copied()
            .collect();
        unreachable.sort();

        for node in unreachable {
            errors.push(ValidationError::Unreachable { node });
        }
    }

    /// Rule 3: the graph is a DAG.
    ///
    /// Kahn's algorithm over the well-formed edges; any node left
    /// unprocessed sits on a cycle and is reported by id.
    fn check_acyclic(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        let mut in_degree: HashMap<NodeId, usize> =
            def.nodes.keys().map(|id| (*id, 0)).collect();
        let mut successors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for edge in &def.edges {
            if !def.nodes.contains_key(&edge.source) || !def.nodes.contains_key(&edge.target) {
                continue;
            }
            successors.entry(edge.source).or_default().push(edge.target);
            *in_degree.entry(edge.target).or_default() += 1;
        }

        let mut queue: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut processed = 0;
        while let Some(current) = queue.pop_front() {
            processed += 1;
            for next in successors.get(&current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        if processed < def.nodes.len() {
            let mut nodes: Vec<NodeId> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id)
                .collect();
            nodes.sort();
            errors.push(ValidationError::Cycle { nodes });
        }
    }

    /// Rule 6: every action type is known to the registry.
    ///
    /// An unknown type is an error, not a warning: it prevents saving a
    /// workflow that can never execute.
    fn check_action_types(&self, def: &WorkflowDefinition, errors: &mut Vec<ValidationError>) {
        let mut ids: Vec<&NodeId> = def.nodes.keys().collect();
        ids.sort();

        for id in ids {
            if let NodeKind::Action(action) = &def.nodes[id].inner {
                if !self.registry.contains(&action.action_type) {
                    errors.push(ValidationError::UnknownActionType {
                        node: *id,
                        action_type: action.action_type.clone(),
                    });
                }
            }
        }
    }
}

/// Outcome of validating a workflow definition.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Returns whether the definition passed every rule.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected violations.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Renders the violations as the ordered error-string list the
    /// editor surfaces verbatim.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// A single structural violation, tied to the offending node or edge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The graph does not have exactly one trigger node.
    #[error("workflow must have exactly one trigger node, found {found}")]
    TriggerCount {
        /// Number of trigger nodes present.
        found: usize,
    },
    /// An edge's source node does not exist.
    #[error("edge {src} -> {target} references non-existent source node {src}")]
    DanglingEdgeSource {
        /// Source id the edge names.
        src: NodeId,
        /// Target id the edge names.
        target: NodeId,
    },
    /// An edge's target node does not exist.
    #[error("edge {src} -> {target} references non-existent target node {target}")]
    DanglingEdgeTarget {
        /// Source id the edge names.
        src: NodeId,
        /// Target id the edge names.
        target: NodeId,
    },
    /// A node is not reachable from the trigger.
    #[error("node {node} is not reachable from the trigger")]
    Unreachable {
        /// The unreachable node.
        node: NodeId,
    },
    /// The graph contains a cycle.
    #[error("workflow contains a cycle involving nodes {}", format_ids(.nodes))]
    Cycle {
        /// Nodes left unprocessed by the topological ordering.
        nodes: Vec<NodeId>,
    },
    /// A condition node is missing a required handle.
    #[error("condition node {node} is missing an outgoing '{handle}' edge")]
    MissingHandle {
        /// The condition node.
        node: NodeId,
        /// The absent handle.
        handle: EdgeHandle,
    },
    /// A handle carries more than one outgoing edge.
    #[error("node {node} has {found} outgoing '{handle}' edges, expected one")]
    DuplicateHandle {
        /// The offending node.
        node: NodeId,
        /// The overloaded handle.
        handle: EdgeHandle,
        /// Number of edges found.
        found: usize,
    },
    /// A node uses a handle its kind does not expose.
    #[error("node {node} cannot have an outgoing '{handle}' edge")]
    InvalidHandle {
        /// The offending node.
        node: NodeId,
        /// The unsupported handle.
        handle: EdgeHandle,
    },
    /// An edge targets the trigger node.
    #[error("edge {src} -> {target} targets the trigger node")]
    EdgeIntoTrigger {
        /// Source of the offending edge.
        src: NodeId,
        /// The trigger node.
        target: NodeId,
    },
    /// An action node references an unregistered action type.
    #[error("action node {node} references unknown action type '{action_type}'")]
    UnknownActionType {
        /// The action node.
        node: NodeId,
        /// The unknown registry key.
        action_type: String,
    },
}

fn format_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
