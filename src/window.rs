//! Constraint windows over accumulated physical cost.
//!
//! A window is a set of relational [`Statement`]s such as `t <= 100ns`. Costs only
//! grow along a branch, so every statement is in one of three states for a given
//! accumulated cost:
//!
//! - **satisfied** now,
//! - **open**: not satisfied yet, but a larger cost may satisfy it (`t >= 5ns` at 2ns),
//! - **violated**: no larger cost can satisfy it again (`t < 5ns` at 5ns).
//!
//! Statements on the same symbol are reconciled into their tightest common
//! admissible [`Interval`]; an empty interval is a [`ConflictError`].
//!
//! Every statement is measured against the cost accumulated since the
//! requirement started at its initial node, including statements of nested
//! windows. `AG {AF q}_{t <= 20ns}` therefore bounds the time from the start of
//! the run until each `q`, not the time from each position; on a long enough
//! cycle it fails at the first position reached after 20ns.

use std::collections::BTreeSet;
use std::fmt;

use crate::atom::RelOp;
use crate::error::{ConflictError, MalformedError};
use crate::quantity::{Cost, Quantity, Symbol};

/// One relational bound: `symbol op quantity`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Statement {
    pub symbol: Symbol,
    pub op: RelOp,
    pub bound: Quantity,
}

/// Verdict of a statement (or a whole window) against an accumulated cost.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowVerdict {
    Satisfied,
    /// Not satisfied yet by the first such statement.
    Open(Statement),
    Violated(Statement),
}

impl Statement {
    pub fn new(symbol: Symbol, op: RelOp, bound: Quantity) -> Self {
        Statement { symbol, op, bound }
    }

    pub fn time(op: RelOp, bound: Quantity) -> Self {
        Statement::new(Symbol::Time, op, bound)
    }

    pub fn energy(op: RelOp, bound: Quantity) -> Self {
        Statement::new(Symbol::Energy, op, bound)
    }

    pub fn validate(&self) -> Result<(), MalformedError> {
        if self.bound.symbol() != self.symbol {
            return Err(MalformedError::UnitMismatch {
                symbol: self.symbol,
                unit: self.bound.unit,
            });
        }
        Ok(())
    }

    pub fn verdict(&self, cost: &Cost) -> WindowVerdict {
        let value = cost.get(self.symbol);
        let bound = self.bound.base();
        if self.op.holds(value.cmp(&bound)) {
            return WindowVerdict::Satisfied;
        }
        match self.op {
            RelOp::Lt | RelOp::Le => WindowVerdict::Violated(*self),
            RelOp::Eq if value > bound => WindowVerdict::Violated(*self),
            RelOp::Eq | RelOp::Ne | RelOp::Gt | RelOp::Ge => WindowVerdict::Open(*self),
        }
    }

    /// The admissible interval of this statement alone.
    fn interval(&self) -> Interval {
        let bound = self.bound.base();
        let mut interval = Interval::FULL;
        match self.op {
            RelOp::Lt => match bound.checked_sub(1) {
                Some(hi) => interval.hi = Some(hi),
                None => interval = Interval::EMPTY,
            },
            RelOp::Le => interval.hi = Some(bound),
            RelOp::Eq => {
                interval.lo = bound;
                interval.hi = Some(bound);
            }
            RelOp::Ne => {
                interval.excluded.insert(bound);
            }
            RelOp::Gt => match bound.checked_add(1) {
                Some(lo) => interval.lo = lo,
                None => interval = Interval::EMPTY,
            },
            RelOp::Ge => interval.lo = bound,
        }
        interval
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.op, self.bound)
    }
}

/// A closed integer interval `[lo, hi]` (in base units) with excluded points.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Interval {
    pub lo: u64,
    /// `None` is `+inf`.
    pub hi: Option<u64>,
    pub excluded: BTreeSet<u64>,
}

impl Interval {
    /// `[0, +inf)`, the default admissible interval.
    pub const FULL: Interval = Interval {
        lo: 0,
        hi: None,
        excluded: BTreeSet::new(),
    };

    pub const EMPTY: Interval = Interval {
        lo: 1,
        hi: Some(0),
        excluded: BTreeSet::new(),
    };

    pub fn intersect(&self, other: &Interval) -> Interval {
        let hi = match (self.hi, other.hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Interval {
            lo: self.lo.max(other.lo),
            hi,
            excluded: self.excluded.union(&other.excluded).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.hi {
            None => false,
            Some(hi) if hi < self.lo => true,
            Some(hi) => {
                let excluded = self.excluded.range(self.lo..=hi).count() as u128;
                excluded == (hi - self.lo) as u128 + 1
            }
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        value >= self.lo && self.hi.map_or(true, |hi| value <= hi) && !self.excluded.contains(&value)
    }
}

/// The accumulated set of statements a job is checked under.
///
/// Ordered and duplicate-free so that equal windows hash equally.
#[derive(Debug, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstraintSet {
    statements: BTreeSet<Statement>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> + '_ {
        self.statements.iter()
    }

    /// Adds a statement without reconciling.
    pub fn with(mut self, statement: Statement) -> Self {
        self.statements.insert(statement);
        self
    }

    pub fn validate(&self) -> Result<(), MalformedError> {
        self.statements.iter().try_for_each(Statement::validate)
    }

    /// Tightest common admissible interval for `symbol`.
    pub fn admissible(&self, symbol: Symbol) -> Interval {
        self.statements
            .iter()
            .filter(|s| s.symbol == symbol)
            .fold(Interval::FULL, |acc, s| acc.intersect(&s.interval()))
    }

    /// Checks that every symbol admits at least one value.
    pub fn reconcile(&self) -> Result<(), ConflictError> {
        for symbol in Symbol::ALL {
            if self.admissible(symbol).is_empty() {
                return Err(ConflictError {
                    symbol,
                    statements: self.statements.iter().filter(|s| s.symbol == symbol).copied().collect(),
                });
            }
        }
        Ok(())
    }

    /// Union of both windows, reconciled.
    pub fn merge(&self, other: &ConstraintSet) -> Result<ConstraintSet, ConflictError> {
        let merged = ConstraintSet {
            statements: self.statements.union(&other.statements).copied().collect(),
        };
        merged.reconcile()?;
        Ok(merged)
    }

    /// Evaluates every statement against `cost`. The first violated statement
    /// (in statement order) wins over any open one.
    pub fn verdict(&self, cost: &Cost) -> WindowVerdict {
        let mut verdict = WindowVerdict::Satisfied;
        for statement in &self.statements {
            match statement.verdict(cost) {
                WindowVerdict::Violated(s) => return WindowVerdict::Violated(s),
                WindowVerdict::Open(s) if verdict == WindowVerdict::Satisfied => verdict = WindowVerdict::Open(s),
                WindowVerdict::Open(_) | WindowVerdict::Satisfied => {}
            }
        }
        verdict
    }

    /// Some statement is still open and none is violated at `cost`.
    pub fn is_open(&self, cost: &Cost) -> bool {
        matches!(self.verdict(cost), WindowVerdict::Open(_))
    }
}

impl FromIterator<Statement> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        ConstraintSet {
            statements: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statements = self.statements.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        write!(f, "{}", statements.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn at(ns: u64) -> Cost {
        Cost::of_time(Quantity::ns(ns))
    }

    #[test]
    fn test_statement_verdicts() {
        let lt = Statement::time(RelOp::Lt, Quantity::ns(100));
        assert_eq!(lt.verdict(&at(99)), WindowVerdict::Satisfied);
        assert_eq!(lt.verdict(&at(100)), WindowVerdict::Violated(lt));

        let le = Statement::time(RelOp::Le, Quantity::ns(100));
        assert_eq!(le.verdict(&at(100)), WindowVerdict::Satisfied);
        assert_eq!(le.verdict(&at(101)), WindowVerdict::Violated(le));

        let ge = Statement::time(RelOp::Ge, Quantity::ns(10));
        assert_eq!(ge.verdict(&at(5)), WindowVerdict::Open(ge));
        assert_eq!(ge.verdict(&at(10)), WindowVerdict::Satisfied);

        let eq = Statement::time(RelOp::Eq, Quantity::ns(10));
        assert_eq!(eq.verdict(&at(5)), WindowVerdict::Open(eq));
        assert_eq!(eq.verdict(&at(10)), WindowVerdict::Satisfied);
        assert_eq!(eq.verdict(&at(11)), WindowVerdict::Violated(eq));

        let ne = Statement::time(RelOp::Ne, Quantity::ns(10));
        assert_eq!(ne.verdict(&at(10)), WindowVerdict::Open(ne));
        assert_eq!(ne.verdict(&at(11)), WindowVerdict::Satisfied);
    }

    #[test]
    fn test_reconcile_tightest_interval() {
        let window: ConstraintSet = [
            Statement::time(RelOp::Le, Quantity::ns(100)),
            Statement::time(RelOp::Lt, Quantity::ns(50)),
            Statement::time(RelOp::Ge, Quantity::ns(10)),
        ]
        .into_iter()
        .collect();
        let interval = window.admissible(Symbol::Time);
        assert_eq!(interval.lo, 10_000);
        assert_eq!(interval.hi, Some(49_999));
        assert!(window.reconcile().is_ok());
        assert_eq!(window.admissible(Symbol::Energy), Interval::FULL);
    }

    #[test]
    fn test_reconcile_empty_lists_all_statements() {
        let a = ConstraintSet::new().with(Statement::time(RelOp::Lt, Quantity::ns(10)));
        let b = ConstraintSet::new()
            .with(Statement::time(RelOp::Gt, Quantity::ns(20)))
            .with(Statement::energy(RelOp::Le, Quantity::nj(1)));
        let err = a.merge(&b).unwrap_err();
        assert_eq!(err.symbol, Symbol::Time);
        assert_eq!(err.statements.len(), 2);
        assert!(err.to_string().contains("t < 10ns"));
        assert!(err.to_string().contains("t > 20ns"));
    }

    #[test]
    fn test_point_interval_with_exclusion_is_empty() {
        let window = ConstraintSet::new()
            .with(Statement::time(RelOp::Eq, Quantity::ns(5)))
            .with(Statement::time(RelOp::Ne, Quantity::ns(5)));
        assert!(window.reconcile().is_err());
        let below_zero = ConstraintSet::new().with(Statement::time(RelOp::Lt, Quantity::ps(0)));
        assert!(below_zero.reconcile().is_err());
    }

    #[test]
    fn test_window_verdict_prefers_violation() {
        let window = ConstraintSet::new()
            .with(Statement::time(RelOp::Ge, Quantity::ns(500)))
            .with(Statement::time(RelOp::Lt, Quantity::ns(100)));
        assert!(matches!(window.verdict(&at(50)), WindowVerdict::Open(s) if s.op == RelOp::Ge));
        assert!(window.is_open(&at(50)));
        assert!(!window.is_open(&at(100)));
        assert!(matches!(window.verdict(&at(100)), WindowVerdict::Violated(s) if s.op == RelOp::Lt));
    }

    #[test]
    fn test_unit_mismatch() {
        let window = ConstraintSet::new().with(Statement::time(RelOp::Lt, Quantity::nj(3)));
        assert!(matches!(window.validate(), Err(MalformedError::UnitMismatch { .. })));
    }
}
