//! Connection validation and graph queries.
//!
//! Validators decide whether a proposed [`Connection`] may become an edge.
//! [`GraphLogic`] holds the structural queries (neighbours, descendants,
//! cascading removal) the rest of the engine builds on.

use crate::changes::{EdgeChange, NodeChange};
use crate::connection::{Connection, ConnectionMode, HandleRef};
use crate::model::{Edge, HandleType, Node};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

// ============================================================================
// Graph queries
// ============================================================================

/// Stateless graph helpers over plain node/edge slices.
pub struct GraphLogic;

impl GraphLogic {
    /// Edges touching any of the given nodes, in edge order.
    pub fn connected_edges<'a>(node_ids: &HashSet<&str>, edges: &'a [Edge]) -> Vec<&'a Edge> {
        edges
            .iter()
            .filter(|e| node_ids.contains(e.source.as_str()) || node_ids.contains(e.target.as_str()))
            .collect()
    }

    /// Nodes with an edge pointing into `node_id`.
    pub fn incomers<'a>(node_id: &str, nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
        let sources: HashSet<&str> = edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect();
        nodes.iter().filter(|n| sources.contains(n.id.as_str())).collect()
    }

    /// Nodes an edge from `node_id` points to.
    pub fn outgoers<'a>(node_id: &str, nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
        let targets: HashSet<&str> = edges
            .iter()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.as_str())
            .collect();
        nodes.iter().filter(|n| targets.contains(n.id.as_str())).collect()
    }

    /// All nodes nested under `node_id`, breadth first. Safe on cyclic data.
    pub fn descendants<'a>(node_id: &str, nodes: &'a [Node]) -> Vec<&'a Node> {
        let mut children: HashMap<&str, Vec<&'a Node>> = HashMap::new();
        for node in nodes {
            if let Some(parent) = node.parent_id.as_deref() {
                children.entry(parent).or_default().push(node);
            }
        }

        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([node_id]);
        let mut queue: VecDeque<&str> = VecDeque::from([node_id]);
        while let Some(current) = queue.pop_front() {
            for child in children.get(current).into_iter().flatten() {
                if seen.insert(child.id.as_str()) {
                    out.push(*child);
                    queue.push_back(child.id.as_str());
                }
            }
        }
        out
    }

    /// Change batches removing the given elements.
    ///
    /// Removing a node also removes its descendants and every edge attached to
    /// any removed node. Records follow collection order.
    pub fn removal_changes(
        node_ids: &[&str],
        edge_ids: &[&str],
        nodes: &[Node],
        edges: &[Edge],
    ) -> (Vec<NodeChange>, Vec<EdgeChange>) {
        let mut doomed_nodes: HashSet<&str> = HashSet::new();
        for &id in node_ids {
            if nodes.iter().any(|n| n.id == id) {
                doomed_nodes.insert(id);
                for d in Self::descendants(id, nodes) {
                    doomed_nodes.insert(d.id.as_str());
                }
            }
        }

        let explicit_edges: HashSet<&str> = edge_ids.iter().copied().collect();
        let node_changes = nodes
            .iter()
            .filter(|n| doomed_nodes.contains(n.id.as_str()))
            .map(|n| NodeChange::remove(n.id.clone()))
            .collect();
        let edge_changes = edges
            .iter()
            .filter(|e| {
                explicit_edges.contains(e.id.as_str())
                    || doomed_nodes.contains(e.source.as_str())
                    || doomed_nodes.contains(e.target.as_str())
            })
            .map(|e| EdgeChange::remove(e.id.clone()))
            .collect();
        (node_changes, edge_changes)
    }

    /// Orient a handle pair as source -> target.
    ///
    /// Dragging may start on a target handle; the connection is then reported
    /// with the ends swapped. In loose mode a source-to-source pair keeps the
    /// drag direction.
    pub fn connection_between(from: &HandleRef, to: &HandleRef) -> Connection {
        let (source, target) = if from.handle_type == HandleType::Target {
            (to, from)
        } else {
            (from, to)
        };
        Connection {
            source: source.node_id.clone(),
            source_handle: source.handle_id.clone(),
            target: target.node_id.clone(),
            target_handle: target.handle_id.clone(),
        }
    }

    /// Whether an edge already joins exactly these handles.
    pub fn connection_exists(connection: &Connection, edges: &[Edge]) -> bool {
        edges.iter().any(|e| {
            e.source == connection.source
                && e.target == connection.target
                && e.source_handle == connection.source_handle
                && e.target_handle == connection.target_handle
        })
    }

    /// Generated edge id: `xy-edge__{source}{sourceHandle}-{target}{targetHandle}`.
    pub fn edge_id(connection: &Connection) -> String {
        format!(
            "xy-edge__{}{}-{}{}",
            connection.source,
            connection.source_handle.as_deref().unwrap_or(""),
            connection.target,
            connection.target_handle.as_deref().unwrap_or(""),
        )
    }

    pub fn edge_from_connection(connection: &Connection) -> Edge {
        let mut edge = Edge::new(
            Self::edge_id(connection),
            connection.source.clone(),
            connection.target.clone(),
        );
        edge.source_handle = connection.source_handle.clone();
        edge.target_handle = connection.target_handle.clone();
        edge
    }

    /// New edge collection with the connection appended.
    pub fn add_edge(connection: &Connection, edges: &[Edge]) -> Result<Vec<Edge>, ValidationError> {
        if connection.source == connection.target && connection.source_handle == connection.target_handle {
            return Err(ValidationError::SameHandle);
        }
        if Self::connection_exists(connection, edges) {
            return Err(ValidationError::DuplicateConnection);
        }
        let mut out = edges.to_vec();
        out.push(Self::edge_from_connection(connection));
        Ok(out)
    }
}

// ============================================================================
// Connection Validation Framework
// ============================================================================

/// Result of connection validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }
}

/// Reasons a connection was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Both ends are the same handle
    SameHandle,
    /// Both ends are on the same node
    SameNode,
    /// Strict mode requires a source and a target handle
    IncompatibleHandleTypes(HandleType),
    /// An edge between these handles already exists
    DuplicateConnection,
    /// Node does not accept connections
    NotConnectable(String),
    /// Custom validation failure
    Custom(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameHandle => write!(f, "Cannot connect a handle to itself"),
            Self::SameNode => write!(f, "Cannot connect a node to itself"),
            Self::IncompatibleHandleTypes(t) => {
                let name = match t {
                    HandleType::Source => "source",
                    HandleType::Target => "target",
                };
                write!(f, "Cannot connect two {} handles", name)
            }
            Self::DuplicateConnection => write!(f, "Connection already exists"),
            Self::NotConnectable(id) => write!(f, "Node '{}' is not connectable", id),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// What a validator gets to look at besides the connection itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub mode: ConnectionMode,
    /// Type of the handle the drag started from.
    pub from_type: HandleType,
    /// Type of the candidate handle.
    pub to_type: HandleType,
    pub edges: &'a [Edge],
}

/// Decides whether a connection may be made.
///
/// Any `Fn(&Connection) -> bool` is a validator too.
///
/// # Example
///
/// ```ignore
/// struct OnlyIntoSinks;
///
/// impl ConnectionValidator for OnlyIntoSinks {
///     fn validate(&self, connection: &Connection, _ctx: &ValidationContext<'_>) -> ValidationResult {
///         if connection.target.starts_with("sink") {
///             ValidationResult::Valid
///         } else {
///             ValidationResult::Invalid(ValidationError::Custom("targets must be sinks".into()))
///         }
///     }
/// }
/// ```
pub trait ConnectionValidator {
    fn validate(&self, connection: &Connection, context: &ValidationContext<'_>) -> ValidationResult;
}

impl<F> ConnectionValidator for F
where
    F: Fn(&Connection) -> bool,
{
    fn validate(&self, connection: &Connection, _context: &ValidationContext<'_>) -> ValidationResult {
        if self(connection) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(ValidationError::Custom("Rejected by connection predicate".into()))
        }
    }
}

/// Default rules:
/// 1. Source and target are different nodes
/// 2. In strict mode, one handle is a source and the other a target
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConnectionValidator;

impl ConnectionValidator for DefaultConnectionValidator {
    fn validate(&self, connection: &Connection, context: &ValidationContext<'_>) -> ValidationResult {
        if connection.source == connection.target {
            if connection.source_handle == connection.target_handle {
                return ValidationResult::Invalid(ValidationError::SameHandle);
            }
            return ValidationResult::Invalid(ValidationError::SameNode);
        }

        if context.mode == ConnectionMode::Strict && context.from_type == context.to_type {
            return ValidationResult::Invalid(ValidationError::IncompatibleHandleTypes(context.to_type));
        }

        ValidationResult::Valid
    }
}

/// Rejects connections that duplicate an existing edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesValidator;

impl ConnectionValidator for NoDuplicatesValidator {
    fn validate(&self, connection: &Connection, context: &ValidationContext<'_>) -> ValidationResult {
        if GraphLogic::connection_exists(connection, context.edges) {
            ValidationResult::Invalid(ValidationError::DuplicateConnection)
        } else {
            ValidationResult::Valid
        }
    }
}

/// All validators must pass (AND logic); the first failure is returned.
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators run in the order they were added.
    pub fn add<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, connection: &Connection, context: &ValidationContext<'_>) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(connection, context);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

impl fmt::Debug for CompositeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(source: &str, sh: Option<&str>, target: &str, th: Option<&str>) -> Connection {
        Connection {
            source: source.into(),
            source_handle: sh.map(String::from),
            target: target.into(),
            target_handle: th.map(String::from),
        }
    }

    fn ctx(mode: ConnectionMode, from: HandleType, to: HandleType, edges: &[Edge]) -> ValidationContext<'_> {
        ValidationContext {
            mode,
            from_type: from,
            to_type: to,
            edges,
        }
    }

    // ========================================================================
    // DefaultConnectionValidator
    // ========================================================================

    #[test]
    fn test_default_validator_accepts_source_to_target() {
        let c = conn("A", None, "B", None);
        let result = DefaultConnectionValidator.validate(
            &c,
            &ctx(ConnectionMode::Strict, HandleType::Source, HandleType::Target, &[]),
        );
        assert!(result.is_valid());
    }

    #[test]
    fn test_strict_rejects_same_type_loose_accepts() {
        let c = conn("A", Some("out"), "B", Some("out"));
        let strict = DefaultConnectionValidator.validate(
            &c,
            &ctx(ConnectionMode::Strict, HandleType::Source, HandleType::Source, &[]),
        );
        assert_eq!(
            strict,
            ValidationResult::Invalid(ValidationError::IncompatibleHandleTypes(HandleType::Source))
        );

        let loose = DefaultConnectionValidator.validate(
            &c,
            &ctx(ConnectionMode::Loose, HandleType::Source, HandleType::Source, &[]),
        );
        assert!(loose.is_valid());
    }

    #[test]
    fn test_default_validator_rejects_same_node() {
        let c = conn("A", Some("out"), "A", Some("in"));
        let result = DefaultConnectionValidator.validate(
            &c,
            &ctx(ConnectionMode::Loose, HandleType::Source, HandleType::Target, &[]),
        );
        assert_eq!(result, ValidationResult::Invalid(ValidationError::SameNode));
    }

    // ========================================================================
    // NoDuplicatesValidator / CompositeValidator
    // ========================================================================

    #[test]
    fn test_no_duplicates_validator() {
        let edges = vec![Edge::new("e", "A", "B").with_handles(Some("o"), Some("i"))];
        let c = ctx(ConnectionMode::Strict, HandleType::Source, HandleType::Target, &edges);

        let dup = conn("A", Some("o"), "B", Some("i"));
        assert_eq!(
            NoDuplicatesValidator.validate(&dup, &c),
            ValidationResult::Invalid(ValidationError::DuplicateConnection)
        );
        let other_handle = conn("A", Some("o2"), "B", Some("i"));
        assert!(NoDuplicatesValidator.validate(&other_handle, &c).is_valid());
    }

    #[test]
    fn test_composite_short_circuits_in_order() {
        let edges = vec![Edge::new("e", "A", "A")];
        let validator = CompositeValidator::new()
            .add(DefaultConnectionValidator)
            .add(NoDuplicatesValidator);
        let result = validator.validate(
            &conn("A", None, "A", None),
            &ctx(ConnectionMode::Strict, HandleType::Source, HandleType::Target, &edges),
        );
        // Same-handle check fires before the duplicate check
        assert_eq!(result, ValidationResult::Invalid(ValidationError::SameHandle));
    }

    #[test]
    fn test_closure_validator() {
        let only_into_b = |c: &Connection| c.target == "B";
        let context = ctx(ConnectionMode::Strict, HandleType::Source, HandleType::Target, &[]);
        assert!(only_into_b.validate(&conn("A", None, "B", None), &context).is_valid());
        assert!(!only_into_b.validate(&conn("A", None, "C", None), &context).is_valid());
    }

    #[test]
    fn test_validation_result_and_combinator() {
        let valid = ValidationResult::Valid;
        let invalid = ValidationResult::Invalid(ValidationError::SameNode);
        assert!(valid.clone().and(valid.clone()).is_valid());
        assert_eq!(valid.and(invalid.clone()), invalid);
        assert_eq!(
            invalid.clone().and(ValidationResult::Invalid(ValidationError::SameHandle)),
            invalid
        );
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::SameNode.to_string(), "Cannot connect a node to itself");
        assert_eq!(
            ValidationError::IncompatibleHandleTypes(HandleType::Target).to_string(),
            "Cannot connect two target handles"
        );
        assert_eq!(ValidationError::Custom("nope".into()).to_string(), "nope");
    }

    // ========================================================================
    // GraphLogic
    // ========================================================================

    fn sample_graph() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            Node::new("group", 0.0, 0.0),
            Node::new("a", 0.0, 0.0).with_parent("group"),
            Node::new("a1", 0.0, 0.0).with_parent("a"),
            Node::new("b", 0.0, 0.0),
            Node::new("c", 0.0, 0.0),
        ];
        let edges = vec![
            Edge::new("a-b", "a", "b"),
            Edge::new("b-c", "b", "c"),
            Edge::new("a1-c", "a1", "c"),
        ];
        (nodes, edges)
    }

    #[test]
    fn test_incomers_and_outgoers() {
        let (nodes, edges) = sample_graph();
        let ids = |v: Vec<&Node>| v.into_iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(GraphLogic::incomers("c", &nodes, &edges)), vec!["a1", "b"]);
        assert_eq!(ids(GraphLogic::outgoers("a", &nodes, &edges)), vec!["b"]);
        assert!(GraphLogic::incomers("group", &nodes, &edges).is_empty());
    }

    #[test]
    fn test_descendants_are_transitive_and_cycle_safe() {
        let (nodes, _) = sample_graph();
        let ids: Vec<&str> = GraphLogic::descendants("group", &nodes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a1"]);

        let cyclic = vec![
            Node::new("x", 0.0, 0.0).with_parent("y"),
            Node::new("y", 0.0, 0.0).with_parent("x"),
        ];
        assert_eq!(GraphLogic::descendants("x", &cyclic).len(), 1);
    }

    #[test]
    fn test_connected_edges() {
        let (_, edges) = sample_graph();
        let ids: HashSet<&str> = ["b"].into_iter().collect();
        let found: Vec<&str> = GraphLogic::connected_edges(&ids, &edges).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(found, vec!["a-b", "b-c"]);
    }

    #[test]
    fn test_removal_cascades() {
        let (nodes, edges) = sample_graph();
        let (node_changes, edge_changes) = GraphLogic::removal_changes(&["a"], &["b-c"], &nodes, &edges);
        assert_eq!(node_changes, vec![NodeChange::remove("a"), NodeChange::remove("a1")]);
        assert_eq!(
            edge_changes,
            vec![EdgeChange::remove("a-b"), EdgeChange::remove("b-c"), EdgeChange::remove("a1-c")]
        );
    }

    #[test]
    fn test_connection_between_swaps_target_start() {
        let from = HandleRef::new("B", Some("in"), HandleType::Target);
        let to = HandleRef::new("A", Some("out"), HandleType::Source);
        assert_eq!(GraphLogic::connection_between(&from, &to), conn("A", Some("out"), "B", Some("in")));
        assert_eq!(GraphLogic::connection_between(&to, &from), conn("A", Some("out"), "B", Some("in")));
    }

    #[test]
    fn test_add_edge() {
        let c = conn("A", Some("out"), "B", None);
        let edges = GraphLogic::add_edge(&c, &[]).unwrap();
        assert_eq!(edges[0].id, "xy-edge__Aout-B");
        assert_eq!(edges[0].source_handle.as_deref(), Some("out"));

        assert_eq!(GraphLogic::add_edge(&c, &edges), Err(ValidationError::DuplicateConnection));
        assert_eq!(
            GraphLogic::add_edge(&conn("A", None, "A", None), &[]),
            Err(ValidationError::SameHandle)
        );
    }
}
