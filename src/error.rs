//! Error taxonomy.
//!
//! Two categories are surfaced to callers:
//!
//! - **specification-unsatisfied**: the model violates a requirement. Reported as
//!   [`CheckError::Unsatisfied`] carrying a [`Counterexample`]; constraint
//!   violations are the [`Violation::Constraint`] and [`Violation::Unreached`]
//!   sub-cases.
//! - **malformed input**: a graph, formula or window the checker cannot interpret
//!   ([`GraphError`], [`MalformedError`], [`ConflictError`]).

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::formula::Formula;
use crate::quantity::{Cost, Symbol, Unit};
use crate::types::NodeId;
use crate::window::Statement;

/// Structural problems of a Kripke graph or of the ringlets it is built from.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("adjacency has {adjacency} entries for {nodes} nodes")]
    AdjacencyMismatch { nodes: usize, adjacency: usize },

    #[error("edge {from} -> {to} points outside the graph")]
    DanglingEdge { from: NodeId, to: NodeId },

    #[error("node {node} does not exist")]
    UnknownNode { node: NodeId },

    #[error("node {node} has no outgoing edge")]
    NoSuccessor { node: NodeId },

    #[error("graph has no initial node")]
    NoInitialNodes,

    #[error("initial snapshot {snapshot} is not the pre-state of any ringlet")]
    UnknownInitial { snapshot: String },

    #[error("post-state {snapshot} has no compatible continuation in control state '{target}'")]
    DeadEnd { snapshot: String, target: String },
}

/// A formula, comparison or window shape the checker cannot interpret.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedError {
    #[error("comparison `{comparison}` must relate a variable to a literal")]
    OperandShape { comparison: String },

    #[error("ordering `{comparison}` is only defined between numeric values")]
    NonNumericOrdering { comparison: String },

    #[error("variable '{name}' is not defined at node {node}")]
    UnknownVariable { name: String, node: NodeId },

    #[error("ordering `{comparison}` at node {node}: variable holds a {found} value")]
    DomainMismatch {
        comparison: String,
        node: NodeId,
        found: &'static str,
    },

    #[error("constrained formula `{formula}` must wrap a quantified path formula")]
    UnquantifiedWindow { formula: String },

    #[error("unit {unit} does not measure symbol {symbol}")]
    UnitMismatch { symbol: Symbol, unit: Unit },
}

/// Constraints on one symbol whose tightest common interval is empty.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("constraints on {symbol} admit no value: {}", list_statements(.statements))]
pub struct ConflictError {
    pub symbol: Symbol,
    pub statements: Vec<Statement>,
}

fn list_statements(statements: &[Statement]) -> String {
    statements.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ")
}

/// What went wrong at the last node of a counterexample branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A local formula does not hold.
    Unsatisfied { formula: Rc<Formula>, node: NodeId },
    /// A negated claim was proven to hold.
    Holds { formula: Rc<Formula>, node: NodeId },
    /// An eventuality reached a repeated node without a witness.
    NoWitness { formula: Rc<Formula>, node: NodeId },
    /// A window statement can no longer be satisfied by the accumulated cost.
    Constraint {
        statement: Statement,
        cost: Cost,
        node: NodeId,
    },
    /// A local formula was checked before a window statement opened.
    Unreached {
        statement: Statement,
        cost: Cost,
        node: NodeId,
    },
}

impl Violation {
    pub fn node(&self) -> NodeId {
        match self {
            Violation::Unsatisfied { node, .. }
            | Violation::Holds { node, .. }
            | Violation::NoWitness { node, .. }
            | Violation::Constraint { node, .. }
            | Violation::Unreached { node, .. } => *node,
        }
    }

    /// Budget violations are not truth values: negating the claim they were
    /// found in does not discharge them.
    pub fn is_budget(&self) -> bool {
        matches!(self, Violation::Constraint { .. } | Violation::Unreached { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Unsatisfied { formula, node } => write!(f, "`{}` does not hold at {}", formula, node),
            Violation::Holds { formula, node } => write!(f, "`{}` holds at {} but is negated", formula, node),
            Violation::NoWitness { formula, node } => {
                write!(f, "`{}` found no witness before revisiting {}", formula, node)
            }
            Violation::Constraint { statement, cost, node } => {
                write!(f, "constraint `{}` violated at {} with accumulated cost {}", statement, node, cost)
            }
            Violation::Unreached { statement, cost, node } => {
                write!(f, "constraint `{}` not reached at {} with accumulated cost {}", statement, node, cost)
            }
        }
    }
}

/// A falsifying branch: the ordered node sequence from an initial node to the
/// node where the violation was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample {
    pub violation: Violation,
    pub branch: Vec<NodeId>,
}

impl Counterexample {
    pub fn len(&self) -> usize {
        self.branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branch.is_empty()
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} along ", self.violation)?;
        let path = self.branch.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" -> ");
        write!(f, "[{}]", path)
    }
}

/// Top-level result of checking a specification.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("requirement #{index} `{requirement}` is violated: {counterexample}")]
    Unsatisfied {
        index: usize,
        requirement: Rc<Formula>,
        counterexample: Counterexample,
    },

    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedError),

    #[error("conflicting window: {0}")]
    Conflict(#[from] ConflictError),

    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("worklist drained with {pending} session(s) still pending")]
    Stalled { pending: usize },
}

impl CheckError {
    pub fn counterexample(&self) -> Option<&Counterexample> {
        match self {
            CheckError::Unsatisfied { counterexample, .. } => Some(counterexample),
            _ => None,
        }
    }
}
