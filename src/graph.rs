//! Explicit Kripke structures: immutable node snapshots, cost-bearing edges, and
//! the initial-node set.
//!
//! A [`KripkeGraph`] is built once (by the [`materialize`][crate::materialize]
//! module or a [`KripkeGraphBuilder`]) and never mutated afterwards. The checker
//! only needs [`KripkeGraph::node`], [`KripkeGraph::successors`] and
//! [`KripkeGraph::initial`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::GraphError;
use crate::quantity::Cost;
use crate::table::Table;
use crate::types::NodeId;

/// A value of a state variable.
///
/// Only [`Value::Int`] is a numeric domain; ordering comparisons are undefined
/// for the other variants.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// Name of the value domain, used in error messages.
    pub fn domain(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Whether a snapshot was taken before (read) or after (write) a ringlet executed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum NodeKind {
    Read,
    Write,
}

/// A snapshot of the hardware state machine.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Node {
    /// Variable assignment.
    pub vars: BTreeMap<String, Value>,
    /// Whether the entry action of `current` runs when this snapshot is executed.
    pub execute_on_entry: bool,
    /// Control state the machine is in.
    pub current: String,
    /// Control state the machine moves to next.
    pub target: String,
    pub kind: NodeKind,
}

impl Node {
    /// Creates a read snapshot resting in `state` with no variables.
    pub fn new(state: impl Into<String>) -> Self {
        let state = state.into();
        Node {
            vars: BTreeMap::new(),
            execute_on_entry: false,
            current: state.clone(),
            target: state,
            kind: NodeKind::Read,
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_entry(mut self, execute_on_entry: bool) -> Self {
        self.execute_on_entry = execute_on_entry;
        self
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Compact `{x=1, y=true}` rendering of the variable assignment.
    pub fn compact_vars(&self) -> String {
        self.vars
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            NodeKind::Read => "R",
            NodeKind::Write => "W",
        };
        write!(f, "[{} {}->{}", kind, self.current, self.target)?;
        if self.execute_on_entry {
            write!(f, " entry")?;
        }
        write!(f, "] {{{}}}", self.compact_vars())
    }
}

/// An outgoing transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Edge {
    pub to: NodeId,
    pub cost: Cost,
}

/// An explicit, total Kripke structure.
#[derive(Debug, Clone)]
pub struct KripkeGraph {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<Edge>>,
    initial: BTreeSet<NodeId>,
}

impl KripkeGraph {
    /// Creates a graph from its parts, validating edge targets, totality of the
    /// transition relation, and the initial set.
    pub fn new(nodes: Vec<Node>, adjacency: Vec<Vec<Edge>>, initial: BTreeSet<NodeId>) -> Result<Self, GraphError> {
        if adjacency.len() != nodes.len() {
            return Err(GraphError::AdjacencyMismatch {
                nodes: nodes.len(),
                adjacency: adjacency.len(),
            });
        }
        for (i, edges) in adjacency.iter().enumerate() {
            let from = NodeId::new(i);
            if edges.is_empty() {
                return Err(GraphError::NoSuccessor { node: from });
            }
            if let Some(edge) = edges.iter().find(|e| e.to.index() >= nodes.len()) {
                return Err(GraphError::DanglingEdge { from, to: edge.to });
            }
        }
        if initial.is_empty() {
            return Err(GraphError::NoInitialNodes);
        }
        if let Some(&id) = initial.iter().find(|id| id.index() >= nodes.len()) {
            return Err(GraphError::UnknownNode { node: id });
        }
        Ok(KripkeGraph {
            nodes,
            adjacency,
            initial,
        })
    }

    pub fn builder() -> KripkeGraphBuilder {
        KripkeGraphBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn successors(&self, id: NodeId) -> &[Edge] {
        &self.adjacency[id.index()]
    }

    pub fn initial(&self) -> &BTreeSet<NodeId> {
        &self.initial
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Finds the id of a structurally identical node.
    pub fn find(&self, node: &Node) -> Option<NodeId> {
        self.nodes.iter().position(|n| n == node).map(NodeId::new)
    }
}

/// Incremental construction of a [`KripkeGraph`].
///
/// ```
/// use tctl_rs::graph::{KripkeGraph, Node};
/// use tctl_rs::quantity::Cost;
///
/// let mut builder = KripkeGraph::builder();
/// let a = builder.add_node(Node::new("idle").with_var("busy", false));
/// let b = builder.add_node(Node::new("work").with_var("busy", true));
/// builder.add_edge(a, b, Cost::ZERO);
/// builder.add_edge(b, a, Cost::ZERO);
/// builder.mark_initial(a);
/// let graph = builder.build().unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
#[derive(Default)]
pub struct KripkeGraphBuilder {
    nodes: Table<Node>,
    adjacency: Vec<Vec<Edge>>,
    initial: BTreeSet<NodeId>,
}

impl KripkeGraphBuilder {
    /// Adds a node, returning the id of an existing structurally identical node if any.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let (index, added) = self.nodes.put(node);
        if added {
            self.adjacency.push(Vec::new());
        }
        NodeId::new(index - 1)
    }

    /// Finds the id of a structurally identical node added earlier.
    pub fn find(&self, node: &Node) -> Option<NodeId> {
        self.nodes.get(node).map(|index| NodeId::new(index - 1))
    }

    /// Adds an edge unless an identical one (same target, same cost) exists.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, cost: Cost) {
        let edge = Edge { to, cost };
        let edges = &mut self.adjacency[from.index()];
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    pub fn mark_initial(&mut self, id: NodeId) {
        self.initial.insert(id);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.value(id.index() + 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn successors(&self, id: NodeId) -> &[Edge] {
        &self.adjacency[id.index()]
    }

    pub fn build(self) -> Result<KripkeGraph, GraphError> {
        KripkeGraph::new(self.nodes.into_values(), self.adjacency, self.initial)
    }
}
