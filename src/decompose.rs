//! One-step semantics of TCTL formulas.
//!
//! [`decompose`] takes a formula at one node and produces either an immediate
//! verdict or exactly one [`Obligation`] for the scheduler. Boolean connectives
//! and path operators become [`Obligation::Revisit`] continuations whose
//! [`Precondition`] kind encodes the connective:
//!
//! | formula   | obligation                                                 |
//! |-----------|------------------------------------------------------------|
//! | `l ∧ r`   | revisit `r` after `required(l)`                            |
//! | `l ∨ r`   | revisit `r` unless `skip(l)` holds                         |
//! | `¬e`      | revisit `false` after `ignored(e)`                         |
//! | `l → r`   | as `¬l ∨ r`                                                |
//! | `AG e`    | revisit successors of `AG e` after `required(e)`           |
//! | `AF e`    | revisit successors of `AF e` unless `skip(e)` holds        |
//! | `AX e`    | step to successors with `e`                                |
//! | `A[l U r]`| unless `skip(r)`: after `required(l)` revisit successors   |
//! | `{e}_w`   | add constraints `w`, continue with `e`                     |
//!
//! State formulas (no path operator, no window) are evaluated in place.
//!
//! Positions whose accumulated cost has not yet reached an open window statement
//! (`t >= 50ns` at 20ns) are outside the window: `G`, `F`, `U` and `W` move on to
//! the successors without looking at their operands there. A state formula
//! checked directly at such a position fails with [`Violation::Unreached`].

use std::rc::Rc;

use crate::error::{MalformedError, Violation};
use crate::formula::{to_universal, Formula, PathOp, Quantifier};
use crate::graph::Node;
use crate::quantity::Cost;
use crate::types::NodeId;
use crate::window::{ConstraintSet, WindowVerdict};

/// How a suspended continuation reacts to the outcome of its precondition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RevisitKind {
    /// Failure is fatal for the chain; success resumes the continuation.
    Required,
    /// Success discharges the continuation; failure resumes it.
    Skip,
    /// Success refutes the owner; failure discharges the continuation.
    Ignored,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Precondition {
    Required(Rc<Formula>),
    Skip(Rc<Formula>),
    Ignored(Rc<Formula>),
}

impl Precondition {
    pub fn formula(&self) -> &Rc<Formula> {
        match self {
            Precondition::Required(f) | Precondition::Skip(f) | Precondition::Ignored(f) => f,
        }
    }

    pub fn kind(&self) -> RevisitKind {
        match self {
            Precondition::Required(_) => RevisitKind::Required,
            Precondition::Skip(_) => RevisitKind::Skip,
            Precondition::Ignored(_) => RevisitKind::Ignored,
        }
    }
}

/// Work emitted by one decomposition step.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Obligation {
    /// Check the formula at the same node, same history.
    Here(Rc<Formula>),
    /// Check the formula at every successor, extending the history.
    Successors(Rc<Formula>),
    /// Check the formula at every successor with a fresh history.
    Step(Rc<Formula>),
    /// Run `resume` once `precondition` resolves, according to its kind.
    Revisit {
        resume: Box<Obligation>,
        precondition: Precondition,
    },
    /// Merge `window` into the constraint set and continue with `formula`.
    AddConstraints { formula: Rc<Formula>, window: ConstraintSet },
}

impl Obligation {
    fn revisit(resume: Obligation, precondition: Precondition) -> Self {
        Obligation::Revisit {
            resume: Box::new(resume),
            precondition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(Violation),
    Obligation(Obligation),
}

/// Where a formula is being decomposed.
#[derive(Debug, Copy, Clone)]
pub struct Position<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    /// The node already occurs in the history of the current path formula.
    pub in_cycle: bool,
    /// Cost accumulated since the requirement started.
    pub cost: Cost,
    pub constraints: &'a ConstraintSet,
}

impl Position<'_> {
    /// The position lies before an open window statement.
    pub fn before_window(&self) -> bool {
        self.constraints.is_open(&self.cost)
    }
}

/// Result of evaluating a state formula in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Local {
    Holds,
    /// The formula does not hold here.
    Fails(Violation),
    /// A window statement is not satisfied yet.
    Open(Violation),
    /// A window statement can no longer be satisfied.
    Violated(Violation),
}

/// Evaluates a state formula at `pos`, checking the window first.
pub fn evaluate_local(formula: &Rc<Formula>, pos: &Position<'_>) -> Result<Local, MalformedError> {
    match pos.constraints.verdict(&pos.cost) {
        WindowVerdict::Violated(statement) => {
            return Ok(Local::Violated(Violation::Constraint {
                statement,
                cost: pos.cost,
                node: pos.id,
            }));
        }
        WindowVerdict::Open(statement) => {
            return Ok(Local::Open(Violation::Unreached {
                statement,
                cost: pos.cost,
                node: pos.id,
            }));
        }
        WindowVerdict::Satisfied => {}
    }
    if evaluate_state(formula, pos.node, pos.id)? {
        Ok(Local::Holds)
    } else {
        Ok(Local::Fails(Violation::Unsatisfied {
            formula: formula.clone(),
            node: pos.id,
        }))
    }
}

/// Boolean value of a state formula at one node.
///
/// # Panics
///
/// Panics if `formula` contains a path operator or a window.
pub fn evaluate_state(formula: &Formula, node: &Node, id: NodeId) -> Result<bool, MalformedError> {
    Ok(match formula {
        Formula::Atom(atom) => atom.evaluate(node, id)?,
        Formula::Not(e) => !evaluate_state(e, node, id)?,
        Formula::And(l, r) => evaluate_state(l, node, id)? && evaluate_state(r, node, id)?,
        Formula::Or(l, r) => evaluate_state(l, node, id)? || evaluate_state(r, node, id)?,
        Formula::Implies(l, r) => !evaluate_state(l, node, id)? || evaluate_state(r, node, id)?,
        Formula::Path(..) | Formula::Constrained(..) => {
            unreachable!("temporal formula `{}` evaluated as a state formula", formula)
        }
    })
}

/// One decomposition step of `formula` at `pos`.
pub fn decompose(formula: &Rc<Formula>, pos: &Position<'_>) -> Result<Outcome, MalformedError> {
    if formula.is_state_formula() {
        return Ok(match evaluate_local(formula, pos)? {
            Local::Holds => Outcome::Pass,
            Local::Fails(violation) | Local::Open(violation) | Local::Violated(violation) => Outcome::Fail(violation),
        });
    }

    let no_witness = || {
        Outcome::Fail(Violation::NoWitness {
            formula: formula.clone(),
            node: pos.id,
        })
    };

    let obligation = match &**formula {
        Formula::Atom(_) => unreachable!(),
        Formula::Not(e) => Obligation::revisit(
            Obligation::Here(Rc::new(Formula::falsity())),
            Precondition::Ignored(e.clone()),
        ),
        Formula::And(l, r) => Obligation::revisit(Obligation::Here(r.clone()), Precondition::Required(l.clone())),
        Formula::Or(l, r) => Obligation::revisit(Obligation::Here(r.clone()), Precondition::Skip(l.clone())),
        Formula::Implies(l, r) => Obligation::revisit(
            Obligation::Here(r.clone()),
            Precondition::Skip(Rc::new(Formula::Not(l.clone()))),
        ),
        Formula::Path(Quantifier::E, _) => Obligation::Here(to_universal(formula)),
        Formula::Path(Quantifier::A, op) => match op {
            PathOp::Globally(_) | PathOp::Finally(_) | PathOp::Until(..) | PathOp::WeakUntil(..)
                if pos.before_window() && !pos.in_cycle =>
            {
                Obligation::Successors(formula.clone())
            }
            PathOp::Globally(e) => {
                if pos.in_cycle {
                    return Ok(Outcome::Pass);
                }
                Obligation::revisit(
                    Obligation::Successors(formula.clone()),
                    Precondition::Required(e.clone()),
                )
            }
            PathOp::Finally(e) => {
                if pos.in_cycle {
                    return Ok(no_witness());
                }
                Obligation::revisit(Obligation::Successors(formula.clone()), Precondition::Skip(e.clone()))
            }
            PathOp::Next(e) => Obligation::Step(e.clone()),
            PathOp::Until(l, r) | PathOp::WeakUntil(l, r) => {
                if pos.in_cycle {
                    return Ok(match op {
                        PathOp::WeakUntil(..) => Outcome::Pass,
                        _ => no_witness(),
                    });
                }
                let step = Obligation::revisit(
                    Obligation::Successors(formula.clone()),
                    Precondition::Required(l.clone()),
                );
                Obligation::revisit(step, Precondition::Skip(r.clone()))
            }
        },
        Formula::Constrained(e, window) => Obligation::AddConstraints {
            formula: e.clone(),
            window: window.clone(),
        },
    };
    Ok(Outcome::Obligation(obligation))
}
