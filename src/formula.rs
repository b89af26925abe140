//! Branching-time formulas with optional cost windows (TCTL).
//!
//! A [`Formula`] combines atomic propositions with boolean connectives, path
//! quantifiers (A = all paths, E = some path) applied to path operators
//! (X = next, F = finally, G = globally, U = until, W = weak until), and
//! constrained formulas `{φ}_{window}` bounding the accumulated cost.
//!
//! The checker only schedules universal formulas: [`to_universal`] rewrites every
//! existential subformula into its negated universal dual before checking.

use std::fmt;
use std::rc::Rc;

use crate::atom::Atom;
use crate::error::{CheckError, MalformedError};
use crate::window::{ConstraintSet, Statement};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Quantifier {
    /// For all paths.
    A,
    /// There exists a path.
    E,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum PathOp {
    Globally(Rc<Formula>),
    Finally(Rc<Formula>),
    Next(Rc<Formula>),
    Until(Rc<Formula>, Rc<Formula>),
    WeakUntil(Rc<Formula>, Rc<Formula>),
}

/// TCTL formula abstract syntax tree.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    Atom(Atom),
    Not(Rc<Formula>),
    And(Rc<Formula>, Rc<Formula>),
    Or(Rc<Formula>, Rc<Formula>),
    Implies(Rc<Formula>, Rc<Formula>),
    /// Quantified path formula.
    Path(Quantifier, PathOp),
    /// Quantified path formula checked under a cost window.
    Constrained(Rc<Formula>, ConstraintSet),
}

impl Formula {
    pub fn atom(atom: Atom) -> Self {
        Formula::Atom(atom)
    }

    /// `name = true`.
    pub fn flag(name: impl Into<String>) -> Self {
        Formula::Atom(Atom::flag(name))
    }

    pub fn truth() -> Self {
        Formula::Atom(Atom::True)
    }

    pub fn falsity() -> Self {
        Formula::Atom(Atom::False)
    }

    pub fn not(self) -> Self {
        Formula::Not(Rc::new(self))
    }

    pub fn and(self, other: Self) -> Self {
        Formula::And(Rc::new(self), Rc::new(other))
    }

    pub fn or(self, other: Self) -> Self {
        Formula::Or(Rc::new(self), Rc::new(other))
    }

    pub fn implies(self, other: Self) -> Self {
        Formula::Implies(Rc::new(self), Rc::new(other))
    }

    pub fn ag(self) -> Self {
        Formula::Path(Quantifier::A, PathOp::Globally(Rc::new(self)))
    }

    pub fn af(self) -> Self {
        Formula::Path(Quantifier::A, PathOp::Finally(Rc::new(self)))
    }

    pub fn ax(self) -> Self {
        Formula::Path(Quantifier::A, PathOp::Next(Rc::new(self)))
    }

    pub fn au(self, other: Self) -> Self {
        Formula::Path(Quantifier::A, PathOp::Until(Rc::new(self), Rc::new(other)))
    }

    pub fn aw(self, other: Self) -> Self {
        Formula::Path(Quantifier::A, PathOp::WeakUntil(Rc::new(self), Rc::new(other)))
    }

    pub fn eg(self) -> Self {
        Formula::Path(Quantifier::E, PathOp::Globally(Rc::new(self)))
    }

    pub fn ef(self) -> Self {
        Formula::Path(Quantifier::E, PathOp::Finally(Rc::new(self)))
    }

    pub fn ex(self) -> Self {
        Formula::Path(Quantifier::E, PathOp::Next(Rc::new(self)))
    }

    pub fn eu(self, other: Self) -> Self {
        Formula::Path(Quantifier::E, PathOp::Until(Rc::new(self), Rc::new(other)))
    }

    pub fn ew(self, other: Self) -> Self {
        Formula::Path(Quantifier::E, PathOp::WeakUntil(Rc::new(self), Rc::new(other)))
    }

    /// Wraps `self` (a quantified path formula) in a cost window.
    pub fn within(self, statements: impl IntoIterator<Item = Statement>) -> Self {
        Formula::Constrained(Rc::new(self), statements.into_iter().collect())
    }

    /// A state formula contains no path operator and no window: it can be
    /// evaluated at a single node.
    pub fn is_state_formula(&self) -> bool {
        match self {
            Formula::Atom(_) => true,
            Formula::Not(e) => e.is_state_formula(),
            Formula::And(l, r) | Formula::Or(l, r) | Formula::Implies(l, r) => {
                l.is_state_formula() && r.is_state_formula()
            }
            Formula::Path(..) | Formula::Constrained(..) => false,
        }
    }

    /// Number of AST nodes.
    pub fn size(&self) -> usize {
        match self {
            Formula::Atom(_) => 1,
            Formula::Not(e) => 1 + e.size(),
            Formula::And(l, r) | Formula::Or(l, r) | Formula::Implies(l, r) => 1 + l.size() + r.size(),
            Formula::Path(_, op) => match op {
                PathOp::Globally(e) | PathOp::Finally(e) | PathOp::Next(e) => 1 + e.size(),
                PathOp::Until(l, r) | PathOp::WeakUntil(l, r) => 1 + l.size() + r.size(),
            },
            Formula::Constrained(e, _) => 1 + e.size(),
        }
    }

    /// Checks atom shapes, window placement and units, and reconciles every chain
    /// of nested windows.
    pub fn validate(&self) -> Result<(), CheckError> {
        self.validate_under(&ConstraintSet::new())
    }

    fn validate_under(&self, outer: &ConstraintSet) -> Result<(), CheckError> {
        match self {
            Formula::Atom(atom) => atom.validate()?,
            Formula::Not(e) => e.validate_under(outer)?,
            Formula::And(l, r) | Formula::Or(l, r) | Formula::Implies(l, r) => {
                l.validate_under(outer)?;
                r.validate_under(outer)?;
            }
            Formula::Path(_, op) => match op {
                PathOp::Globally(e) | PathOp::Finally(e) | PathOp::Next(e) => e.validate_under(outer)?,
                PathOp::Until(l, r) | PathOp::WeakUntil(l, r) => {
                    l.validate_under(outer)?;
                    r.validate_under(outer)?;
                }
            },
            Formula::Constrained(e, window) => {
                if !matches!(**e, Formula::Path(..)) {
                    return Err(MalformedError::UnquantifiedWindow {
                        formula: self.to_string(),
                    }
                    .into());
                }
                window.validate()?;
                let merged = outer.merge(window)?;
                e.validate_under(&merged)?;
            }
        }
        Ok(())
    }
}

impl From<Atom> for Formula {
    fn from(atom: Atom) -> Self {
        Formula::Atom(atom)
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::A => write!(f, "A"),
            Quantifier::E => write!(f, "E"),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Atom(atom) => write!(f, "{}", atom),
            Formula::Not(e) => write!(f, "¬{}", e),
            Formula::And(l, r) => write!(f, "({} ∧ {})", l, r),
            Formula::Or(l, r) => write!(f, "({} ∨ {})", l, r),
            Formula::Implies(l, r) => write!(f, "({} → {})", l, r),
            Formula::Path(q, op) => match op {
                PathOp::Globally(e) => write!(f, "{}G {}", q, e),
                PathOp::Finally(e) => write!(f, "{}F {}", q, e),
                PathOp::Next(e) => write!(f, "{}X {}", q, e),
                PathOp::Until(l, r) => write!(f, "{}[{} U {}]", q, l, r),
                PathOp::WeakUntil(l, r) => write!(f, "{}[{} W {}]", q, l, r),
            },
            Formula::Constrained(e, window) => write!(f, "{{{}}}_{{{}}}", e, window),
        }
    }
}

fn neg(e: Rc<Formula>) -> Rc<Formula> {
    Rc::new(Formula::Not(e))
}

fn universal(op: PathOp) -> Rc<Formula> {
    Rc::new(Formula::Path(Quantifier::A, op))
}

/// Rewrites every existential path formula into its universal dual:
///
/// ```text
/// E G e      ≡ ¬A F ¬e
/// E F e      ≡ ¬A G ¬e
/// E X e      ≡ ¬A X ¬e
/// E (l U r)  ≡ ¬A (¬r W (¬l ∧ ¬r))
/// E (l W r)  ≡ ¬A (¬r U (¬l ∧ ¬r))
/// ```
///
/// The result contains no [`Quantifier::E`]. Subformulas without existential
/// quantifiers are shared with the input.
pub fn to_universal(formula: &Rc<Formula>) -> Rc<Formula> {
    match &**formula {
        Formula::Atom(_) => formula.clone(),
        Formula::Not(e) => rebuild1(formula, e, Formula::Not),
        Formula::And(l, r) => rebuild2(formula, l, r, Formula::And),
        Formula::Or(l, r) => rebuild2(formula, l, r, Formula::Or),
        Formula::Implies(l, r) => rebuild2(formula, l, r, Formula::Implies),
        Formula::Constrained(e, window) => {
            let e2 = to_universal(e);
            if Rc::ptr_eq(e, &e2) {
                formula.clone()
            } else {
                Rc::new(Formula::Constrained(e2, window.clone()))
            }
        }
        Formula::Path(Quantifier::A, op) => match op {
            PathOp::Globally(e) => rebuild1(formula, e, |e| Formula::Path(Quantifier::A, PathOp::Globally(e))),
            PathOp::Finally(e) => rebuild1(formula, e, |e| Formula::Path(Quantifier::A, PathOp::Finally(e))),
            PathOp::Next(e) => rebuild1(formula, e, |e| Formula::Path(Quantifier::A, PathOp::Next(e))),
            PathOp::Until(l, r) => rebuild2(formula, l, r, |l, r| Formula::Path(Quantifier::A, PathOp::Until(l, r))),
            PathOp::WeakUntil(l, r) => {
                rebuild2(formula, l, r, |l, r| Formula::Path(Quantifier::A, PathOp::WeakUntil(l, r)))
            }
        },
        Formula::Path(Quantifier::E, op) => {
            let dual = match op {
                PathOp::Globally(e) => PathOp::Finally(neg(to_universal(e))),
                PathOp::Finally(e) => PathOp::Globally(neg(to_universal(e))),
                PathOp::Next(e) => PathOp::Next(neg(to_universal(e))),
                PathOp::Until(l, r) => {
                    let (hold, stop) = until_dual(l, r);
                    PathOp::WeakUntil(hold, stop)
                }
                PathOp::WeakUntil(l, r) => {
                    let (hold, stop) = until_dual(l, r);
                    PathOp::Until(hold, stop)
                }
            };
            neg(universal(dual))
        }
    }
}

/// Operands of the universal dual of `E (l U r)` and `E (l W r)`: a path
/// refutes both as soon as `¬l ∧ ¬r` is reached while `r` has not held yet.
fn until_dual(l: &Rc<Formula>, r: &Rc<Formula>) -> (Rc<Formula>, Rc<Formula>) {
    let not_r = neg(to_universal(r));
    let stop = Rc::new(Formula::And(neg(to_universal(l)), not_r.clone()));
    (not_r, stop)
}

fn rebuild1(formula: &Rc<Formula>, e: &Rc<Formula>, make: impl FnOnce(Rc<Formula>) -> Formula) -> Rc<Formula> {
    let e2 = to_universal(e);
    if Rc::ptr_eq(e, &e2) {
        formula.clone()
    } else {
        Rc::new(make(e2))
    }
}

fn rebuild2(
    formula: &Rc<Formula>,
    l: &Rc<Formula>,
    r: &Rc<Formula>,
    make: impl FnOnce(Rc<Formula>, Rc<Formula>) -> Formula,
) -> Rc<Formula> {
    let l2 = to_universal(l);
    let r2 = to_universal(r);
    if Rc::ptr_eq(l, &l2) && Rc::ptr_eq(r, &r2) {
        formula.clone()
    } else {
        Rc::new(make(l2, r2))
    }
}

/// Whether any existential quantifier remains.
pub fn is_universal(formula: &Formula) -> bool {
    match formula {
        Formula::Atom(_) => true,
        Formula::Not(e) | Formula::Constrained(e, _) => is_universal(e),
        Formula::And(l, r) | Formula::Or(l, r) | Formula::Implies(l, r) => is_universal(l) && is_universal(r),
        Formula::Path(Quantifier::E, _) => false,
        Formula::Path(Quantifier::A, op) => match op {
            PathOp::Globally(e) | PathOp::Finally(e) | PathOp::Next(e) => is_universal(e),
            PathOp::Until(l, r) | PathOp::WeakUntil(l, r) => is_universal(l) && is_universal(r),
        },
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::atom::RelOp;
    use crate::quantity::Quantity;

    fn p() -> Formula {
        Formula::flag("p")
    }

    fn q() -> Formula {
        Formula::flag("q")
    }

    #[test]
    fn test_display() {
        assert_eq!(p().ag().to_string(), "AG p = true");
        assert_eq!(p().eu(q()).to_string(), "E[p = true U q = true]");
        let timed = p().ax().within([Statement::time(RelOp::Lt, Quantity::ns(100))]);
        assert_eq!(timed.to_string(), "{AX p = true}_{t < 100ns}");
    }

    #[test]
    fn test_state_formula() {
        assert!(p().and(q().not()).is_state_formula());
        assert!(p().implies(q()).is_state_formula());
        assert!(!p().and(q().af()).is_state_formula());
    }

    #[test]
    fn test_existential_duals() {
        let cases = [
            (p().eg(), p().not().af().not()),
            (p().ef(), p().not().ag().not()),
            (p().ex(), p().not().ax().not()),
            (p().eu(q()), q().not().aw(p().not().and(q().not())).not()),
            (p().ew(q()), q().not().au(p().not().and(q().not())).not()),
        ];
        for (existential, expected) in cases {
            let rewritten = to_universal(&Rc::new(existential));
            assert_eq!(*rewritten, expected);
            assert!(is_universal(&rewritten));
        }
    }

    #[test]
    fn test_rewrite_is_deep_and_shares_universal_parts() {
        let universal_part = Rc::new(p().ag());
        let formula = Rc::new(Formula::And(universal_part.clone(), Rc::new(q().ef().ax())));
        let rewritten = to_universal(&formula);
        assert!(is_universal(&rewritten));
        match &*rewritten {
            Formula::And(l, _) => assert!(Rc::ptr_eq(l, &universal_part)),
            other => panic!("unexpected rewrite {}", other),
        }

        let untouched = Rc::new(p().au(q()));
        assert!(Rc::ptr_eq(&to_universal(&untouched), &untouched));
    }

    #[test]
    fn test_validate_window_placement() {
        let bad = p().within([Statement::time(RelOp::Lt, Quantity::ns(1))]);
        assert!(matches!(
            bad.validate(),
            Err(CheckError::Malformed(MalformedError::UnquantifiedWindow { .. }))
        ));
        let good = p().af().within([Statement::time(RelOp::Lt, Quantity::ns(1))]);
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_validate_nested_windows_conflict() {
        let inner = p().af().within([Statement::time(RelOp::Gt, Quantity::ns(50))]);
        let outer = inner.ag().within([Statement::time(RelOp::Le, Quantity::ns(10))]);
        match outer.validate() {
            Err(CheckError::Conflict(err)) => assert_eq!(err.statements.len(), 2),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }
}
