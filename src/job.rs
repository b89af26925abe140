//! Scheduler records: jobs, revisits and sessions, plus their dedup keys.
//!
//! All records are plain values owned by a [`JobStore`][crate::store::JobStore]
//! and linked to each other by id only.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::decompose::{Obligation, Precondition, RevisitKind};
use crate::error::Counterexample;
use crate::formula::Formula;
use crate::quantity::Cost;
use crate::types::{NodeId, RevisitId, SessionId};
use crate::window::ConstraintSet;

/// One unit of work: check `formula` at `node`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Job {
    pub node: NodeId,
    pub formula: Rc<Formula>,
    /// Nodes visited by the current path formula before reaching `node`, with
    /// the cost accumulated at their latest visit.
    pub history: BTreeMap<NodeId, Cost>,
    /// Full branch from an initial node up to and including `node`.
    pub trace: Vec<NodeId>,
    pub cost: Cost,
    pub constraints: ConstraintSet,
    /// Session the job belongs to; `None` for the requirement itself.
    pub session: Option<SessionId>,
    /// Continuation to resume once this job's obligations are exhausted.
    pub revisit: Option<RevisitId>,
}

impl Job {
    /// The root job of a requirement at an initial node.
    pub fn root(node: NodeId, formula: Rc<Formula>) -> Self {
        Job {
            node,
            formula,
            history: BTreeMap::new(),
            trace: vec![node],
            cost: Cost::ZERO,
            constraints: ConstraintSet::new(),
            session: None,
            revisit: None,
        }
    }

    pub fn in_cycle(&self) -> bool {
        closes_cycle(&self.history, self.node, self.cost, &self.constraints)
    }

    /// Cost only matters to the outcome under a non-empty window.
    fn relevant_cost(&self) -> Cost {
        if self.constraints.is_empty() {
            Cost::ZERO
        } else {
            self.cost
        }
    }

    pub fn cycle_key(&self) -> CycleKey {
        CycleKey {
            node: self.node,
            formula: self.formula.clone(),
            in_cycle: self.in_cycle(),
            constraints: self.constraints.clone(),
            cost: self.relevant_cost(),
            revisit: self.revisit,
            session: self.session,
        }
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            node: self.node,
            formula: self.formula.clone(),
            constraints: self.constraints.clone(),
            cost: self.relevant_cost(),
        }
    }
}

/// Whether reaching `node` at `cost` repeats a position of `history`.
///
/// Positions before an open window statement are skipped by the path
/// operators, so a loop that started there has not been checked yet: a repeated
/// node only closes a cycle if both visits lie inside the window, or if no cost
/// was spent since the previous visit.
pub fn closes_cycle(history: &BTreeMap<NodeId, Cost>, node: NodeId, cost: Cost, constraints: &ConstraintSet) -> bool {
    match history.get(&node) {
        Some(&seen) => seen == cost || !(constraints.is_open(&seen) || constraints.is_open(&cost)),
        None => false,
    }
}

/// A job is decomposed at most once per cycle key.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CycleKey {
    pub node: NodeId,
    pub formula: Rc<Formula>,
    pub in_cycle: bool,
    pub constraints: ConstraintSet,
    pub cost: Cost,
    pub revisit: Option<RevisitId>,
    pub session: Option<SessionId>,
}

/// Sessions are shared between all claims with an equal key.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SessionKey {
    pub node: NodeId,
    pub formula: Rc<Formula>,
    pub constraints: ConstraintSet,
    pub cost: Cost,
}

/// A suspended continuation together with the context it was suspended in.
#[derive(Debug, Clone)]
pub struct Revisit {
    pub node: NodeId,
    pub resume: Obligation,
    pub precondition: Precondition,
    pub history: BTreeMap<NodeId, Cost>,
    pub trace: Vec<NodeId>,
    pub cost: Cost,
    pub constraints: ConstraintSet,
    pub session: Option<SessionId>,
    /// Continuation of the job that suspended.
    pub parent: Option<RevisitId>,
}

impl Revisit {
    pub fn kind(&self) -> RevisitKind {
        self.precondition.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Pending,
    Pass,
    Fail(Counterexample),
    /// Some branch ran out of its window and no branch failed outright.
    Exceeded(Counterexample),
}

impl SessionResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionResult::Pending)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::atom::RelOp;
    use crate::quantity::Quantity;
    use crate::window::Statement;

    fn job() -> Job {
        Job::root(NodeId::new(1), Rc::new(Formula::flag("p").ag()))
    }

    #[test]
    fn test_history_does_not_split_keys() {
        let a = job();
        let mut b = job();
        b.history.insert(NodeId::new(7), Cost::ZERO);
        b.trace.push(NodeId::new(7));
        assert_ne!(a, b);
        assert_eq!(a.cycle_key(), b.cycle_key());

        b.history.insert(NodeId::new(1), Cost::ZERO);
        assert!(b.in_cycle());
        assert_ne!(a.cycle_key(), b.cycle_key());
    }

    #[test]
    fn test_cost_only_matters_under_window() {
        let a = job();
        let mut b = job();
        b.cost = Cost::of_time(Quantity::ns(5));
        assert_eq!(a.cycle_key(), b.cycle_key());
        assert_eq!(a.session_key(), b.session_key());

        let window = ConstraintSet::new().with(Statement::time(RelOp::Lt, Quantity::ns(10)));
        let mut c = a.clone();
        c.constraints = window.clone();
        let mut d = b.clone();
        d.constraints = window;
        assert_ne!(c.cycle_key(), d.cycle_key());
        assert_ne!(c.session_key(), d.session_key());
    }

    #[test]
    fn test_open_window_defers_cycles() {
        let ns = |t| Cost::of_time(Quantity::ns(t));
        let window = ConstraintSet::new().with(Statement::time(RelOp::Ge, Quantity::ns(50)));
        let mut history = BTreeMap::new();
        history.insert(NodeId::new(1), ns(10));
        history.insert(NodeId::new(2), ns(55));
        let node = NodeId::new(1);

        // Cost was spent towards the open bound since the last visit.
        assert!(!closes_cycle(&history, node, ns(30), &window));
        // The loop from outside the window was never checked inside it.
        assert!(!closes_cycle(&history, node, ns(60), &window));
        // A zero-cost loop makes no progress.
        assert!(closes_cycle(&history, node, ns(10), &window));
        // Both visits inside the window.
        assert!(closes_cycle(&history, NodeId::new(2), ns(70), &window));
        assert!(closes_cycle(&history, node, ns(30), &ConstraintSet::new()));
        assert!(!closes_cycle(&history, NodeId::new(3), Cost::ZERO, &window));
    }

    #[test]
    fn test_session_identity_splits_keys() {
        let a = job();
        let mut b = job();
        b.session = Some(SessionId::new(1));
        assert_ne!(a.cycle_key(), b.cycle_key());
        assert_eq!(a.session_key(), b.session_key());
    }
}
