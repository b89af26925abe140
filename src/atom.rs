//! Atomic propositions and their evaluation against a single node.
//!
//! Evaluation is a pure function of `(atom, node)`. Shape errors (two variables,
//! two literals, ordering on non-numeric literals) are caught statically by
//! [`Atom::validate`]; the only runtime errors are a missing variable and an
//! ordering against a variable holding a non-numeric value.

use std::cmp::Ordering;
use std::fmt;

use crate::error::MalformedError;
use crate::graph::{Node, Value};
use crate::types::NodeId;

/// Relational operator, shared by comparisons and window statements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RelOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl RelOp {
    pub fn is_ordering(self) -> bool {
        !matches!(self, RelOp::Eq | RelOp::Ne)
    }

    /// The operator with its operands swapped: `a < b` iff `b > a`.
    pub fn flip(self) -> RelOp {
        match self {
            RelOp::Lt => RelOp::Gt,
            RelOp::Le => RelOp::Ge,
            RelOp::Gt => RelOp::Lt,
            RelOp::Ge => RelOp::Le,
            op => op,
        }
    }

    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            RelOp::Lt => ordering == Ordering::Less,
            RelOp::Le => ordering != Ordering::Greater,
            RelOp::Eq => ordering == Ordering::Equal,
            RelOp::Ne => ordering != Ordering::Equal,
            RelOp::Gt => ordering == Ordering::Greater,
            RelOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Eq => "=",
            RelOp::Ne => "!=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    Var(String),
    Lit(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Lit(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Comparison {
    pub lhs: Operand,
    pub op: RelOp,
    pub rhs: Operand,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

impl Comparison {
    /// Normalizes to `(variable, op, literal)`.
    fn oriented(&self) -> Result<(&str, RelOp, &Value), MalformedError> {
        match (&self.lhs, &self.rhs) {
            (Operand::Var(name), Operand::Lit(value)) => Ok((name, self.op, value)),
            (Operand::Lit(value), Operand::Var(name)) => Ok((name, self.op.flip(), value)),
            _ => Err(MalformedError::OperandShape {
                comparison: self.to_string(),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), MalformedError> {
        let (_, op, value) = self.oriented()?;
        if op.is_ordering() && !value.is_numeric() {
            return Err(MalformedError::NonNumericOrdering {
                comparison: self.to_string(),
            });
        }
        Ok(())
    }

    fn evaluate(&self, node: &Node, id: NodeId) -> Result<bool, MalformedError> {
        self.validate()?;
        let (name, op, literal) = self.oriented()?;
        let value = node.var(name).ok_or_else(|| MalformedError::UnknownVariable {
            name: name.to_string(),
            node: id,
        })?;
        match (value, literal) {
            (Value::Int(a), Value::Int(b)) => Ok(op.holds(a.cmp(b))),
            _ if op.is_ordering() => Err(MalformedError::DomainMismatch {
                comparison: self.to_string(),
                node: id,
                found: value.domain(),
            }),
            // Values of different domains are never equal.
            _ => Ok(op.holds(if value == literal {
                Ordering::Equal
            } else {
                Ordering::Less
            })),
        }
    }
}

/// An atomic proposition over one node.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Atom {
    True,
    False,
    /// The node rests in the named control state.
    InState(String),
    Compare(Comparison),
}

impl Atom {
    pub fn compare(lhs: Operand, op: RelOp, rhs: Operand) -> Self {
        Atom::Compare(Comparison { lhs, op, rhs })
    }

    /// `name = true`.
    pub fn flag(name: impl Into<String>) -> Self {
        Atom::var(name, RelOp::Eq, true)
    }

    /// `name op value`.
    pub fn var(name: impl Into<String>, op: RelOp, value: impl Into<Value>) -> Self {
        Atom::compare(Operand::Var(name.into()), op, Operand::Lit(value.into()))
    }

    pub fn validate(&self) -> Result<(), MalformedError> {
        match self {
            Atom::Compare(cmp) => cmp.validate(),
            _ => Ok(()),
        }
    }

    /// Evaluates the atom at `node` (whose id is `id`, used for error reports).
    pub fn evaluate(&self, node: &Node, id: NodeId) -> Result<bool, MalformedError> {
        match self {
            Atom::True => Ok(true),
            Atom::False => Ok(false),
            Atom::InState(state) => Ok(node.current == *state),
            Atom::Compare(cmp) => cmp.evaluate(node, id),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::True => write!(f, "true"),
            Atom::False => write!(f, "false"),
            Atom::InState(state) => write!(f, "@{}", state),
            Atom::Compare(cmp) => write!(f, "{}", cmp),
        }
    }
}
