//! The job scheduler.
//!
//! [`Checker`] drives [`decompose`] over the whole graph with a worklist kept in
//! a [`JobStore`]. Every popped job is either dropped (stale session, or its
//! cycle key was already decomposed) or decomposed once. Outcomes are wired back
//! through two continuation mechanisms:
//!
//! - **revisits** with a `required` precondition: the precondition runs in the
//!   owner's session and the continuation resumes (once) when its first leaf is
//!   exhausted; any failure fails the owner.
//! - **sessions** for `skip` and `ignored` preconditions: an independent
//!   sub-search, shared by all claims with the same key, that passes when all of
//!   its jobs and parked waiters are exhausted and fails on the first failing job.
//!   Waiters parked on the session are resumed with its outcome.
//!
//! A branch running out of its window inside a session does not resolve the
//! session. It is remembered, and if no other job of the session fails the
//! session ends as [`SessionResult::Exceeded`], which every waiter forwards to
//! its owner unchanged: negation swaps holding and failing, never a budget
//! violation.
//!
//! A run aborts on the first failure outside any session.
//!
//! ```
//! use tctl_rs::checker::Checker;
//! use tctl_rs::formula::Formula;
//! use tctl_rs::graph::{KripkeGraph, Node};
//! use tctl_rs::quantity::Cost;
//!
//! let mut builder = KripkeGraph::builder();
//! let a = builder.add_node(Node::new("a").with_var("p", true));
//! let b = builder.add_node(Node::new("b").with_var("p", true));
//! builder.add_edge(a, b, Cost::ZERO);
//! builder.add_edge(b, a, Cost::ZERO);
//! builder.mark_initial(a);
//! let graph = builder.build().unwrap();
//!
//! let mut checker = Checker::in_memory(&graph);
//! assert!(checker.check_formula(&Formula::flag("p").ag()).is_ok());
//! assert!(checker.check_formula(&Formula::flag("p").not().ef()).is_err());
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use log::{debug, info, trace, warn};

use crate::decompose::{decompose, evaluate_local, Local, Obligation, Outcome, Position, Precondition, RevisitKind};
use crate::error::{CheckError, ConflictError, Counterexample, MalformedError, Violation};
use crate::formula::{to_universal, Formula};
use crate::graph::KripkeGraph;
use crate::job::{closes_cycle, Job, Revisit, SessionResult};
use crate::quantity::Cost;
use crate::store::{JobStore, MemoryStore, StoreConfig, StoreStats};
use crate::types::{NodeId, RevisitId, SessionId};
use crate::window::ConstraintSet;

/// An ordered list of requirements, each checked from every initial node.
#[derive(Debug, Clone, Default)]
pub struct Specification {
    requirements: Vec<Rc<Formula>>,
}

impl Specification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, requirement: Formula) -> Self {
        self.push(requirement);
        self
    }

    pub fn push(&mut self, requirement: Formula) {
        self.requirements.push(Rc::new(requirement));
    }

    pub fn requirements(&self) -> &[Rc<Formula>] {
        &self.requirements
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Static checks performed before any scheduling.
    pub fn validate(&self) -> Result<(), CheckError> {
        self.requirements.iter().try_for_each(|r| r.validate())
    }
}

impl FromIterator<Formula> for Specification {
    fn from_iter<I: IntoIterator<Item = Formula>>(iter: I) -> Self {
        Specification {
            requirements: iter.into_iter().map(Rc::new).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Log a progress line every `progress_interval` decomposed jobs (0 disables).
    pub progress_interval: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100_000,
        }
    }
}

/// Why a run stopped early.
enum Halt {
    Refuted(Counterexample),
    Error(CheckError),
}

impl From<MalformedError> for Halt {
    fn from(err: MalformedError) -> Self {
        Halt::Error(err.into())
    }
}

impl From<ConflictError> for Halt {
    fn from(err: ConflictError) -> Self {
        Halt::Error(err.into())
    }
}

/// The part of a job or revisit that obligations are executed in.
struct Frame {
    node: NodeId,
    history: BTreeMap<NodeId, Cost>,
    trace: Vec<NodeId>,
    cost: Cost,
    constraints: ConstraintSet,
    session: Option<SessionId>,
}

impl Frame {
    fn job(&self, formula: Rc<Formula>, revisit: Option<RevisitId>) -> Job {
        Job {
            node: self.node,
            formula,
            history: self.history.clone(),
            trace: self.trace.clone(),
            cost: self.cost,
            constraints: self.constraints.clone(),
            session: self.session,
            revisit,
        }
    }

    fn counterexample(&self, violation: Violation) -> Counterexample {
        Counterexample {
            violation,
            branch: self.trace.clone(),
        }
    }
}

impl From<&Job> for Frame {
    fn from(job: &Job) -> Self {
        Frame {
            node: job.node,
            history: job.history.clone(),
            trace: job.trace.clone(),
            cost: job.cost,
            constraints: job.constraints.clone(),
            session: job.session,
        }
    }
}

impl From<&Revisit> for Frame {
    fn from(revisit: &Revisit) -> Self {
        Frame {
            node: revisit.node,
            history: revisit.history.clone(),
            trace: revisit.trace.clone(),
            cost: revisit.cost,
            constraints: revisit.constraints.clone(),
            session: revisit.session,
        }
    }
}

pub struct Checker<'g, S = MemoryStore> {
    graph: &'g KripkeGraph,
    store: S,
    config: CheckerConfig,
    /// Sessions resolved but whose waiters were not resumed yet.
    resolved: VecDeque<SessionId>,
}

impl<'g> Checker<'g, MemoryStore> {
    /// A checker with a default in-memory store.
    pub fn in_memory(graph: &'g KripkeGraph) -> Self {
        Checker::new(graph, MemoryStore::new(StoreConfig::default()), CheckerConfig::default())
    }
}

impl<'g, S> Checker<'g, S>
where
    S: JobStore,
{
    pub fn new(graph: &'g KripkeGraph, store: S, config: CheckerConfig) -> Self {
        Self {
            graph,
            store,
            config,
            resolved: VecDeque::new(),
        }
    }

    pub fn graph(&self) -> &'g KripkeGraph {
        self.graph
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Statistics of the last run.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Checks every requirement in order, stopping at the first violated one.
    pub fn check(&mut self, spec: &Specification) -> Result<(), CheckError> {
        spec.validate()?;
        self.store.reset();
        self.resolved.clear();
        for (index, requirement) in spec.requirements().iter().enumerate() {
            self.check_requirement(index, requirement)?;
        }
        info!("All {} requirement(s) hold: {:?}", spec.len(), self.store.stats());
        Ok(())
    }

    pub fn check_formula(&mut self, formula: &Formula) -> Result<(), CheckError> {
        self.check(&Specification::new().with(formula.clone()))
    }

    fn check_requirement(&mut self, index: usize, requirement: &Rc<Formula>) -> Result<(), CheckError> {
        let formula = to_universal(requirement);
        info!(
            "Checking requirement #{} `{}` from {} initial node(s)",
            index,
            requirement,
            self.graph.initial().len()
        );
        if formula != *requirement {
            debug!("Rewritten to `{}`", formula);
        }
        let graph = self.graph;
        for &node in graph.initial() {
            self.spawn(Job::root(node, formula.clone()));
        }
        match self.run() {
            Ok(()) => Ok(()),
            Err(Halt::Refuted(counterexample)) => {
                info!("Requirement #{} is violated: {}", index, counterexample);
                Err(CheckError::Unsatisfied {
                    index,
                    requirement: requirement.clone(),
                    counterexample,
                })
            }
            Err(Halt::Error(err)) => Err(err),
        }
    }

    fn run(&mut self) -> Result<(), Halt> {
        let mut processed = 0usize;
        loop {
            self.notify_resolved()?;
            let Some(id) = self.store.next_pending() else {
                break;
            };
            let job = self.store.job(id).clone();
            self.process(job)?;
            processed += 1;
            if self.config.progress_interval > 0 && processed % self.config.progress_interval == 0 {
                info!(
                    "Processed {} jobs, {} session(s) pending: {:?}",
                    processed,
                    self.store.pending_sessions(),
                    self.store.stats()
                );
            }
        }
        let pending = self.store.pending_sessions();
        if pending > 0 {
            return Err(Halt::Error(CheckError::Stalled { pending }));
        }
        Ok(())
    }

    fn is_resolved(&self, session: Option<SessionId>) -> bool {
        session.is_some_and(|s| !self.store.session_result(s).is_pending())
    }

    fn process(&mut self, job: Job) -> Result<(), Halt> {
        if self.is_resolved(job.session) {
            trace!("process: stale `{}` at {} in resolved session", job.formula, job.node);
            self.release(job.session);
            return Ok(());
        }
        if self.store.seen_cycle(job.cycle_key()) {
            trace!("process: duplicate `{}` at {}", job.formula, job.node);
            self.release(job.session);
            return Ok(());
        }
        self.store.record_decomposed();

        let graph = self.graph;
        let pos = Position {
            id: job.node,
            node: graph.node(job.node),
            in_cycle: job.in_cycle(),
            cost: job.cost,
            constraints: &job.constraints,
        };
        debug!(
            "decompose(`{}` at {}, in_cycle = {}, session = {:?})",
            job.formula, job.node, pos.in_cycle, job.session
        );
        match decompose(&job.formula, &pos)? {
            Outcome::Pass => self.exhaust(job.revisit)?,
            Outcome::Fail(violation) => {
                let frame = Frame::from(&job);
                self.fail(job.session, frame.counterexample(violation))?;
            }
            Outcome::Obligation(obligation) => self.execute(obligation, &Frame::from(&job), job.revisit)?,
        }
        self.release(job.session);
        Ok(())
    }

    fn spawn(&mut self, job: Job) {
        if let Some(session) = job.session {
            self.store.retain_session(session);
        }
        let id = self.store.job_for(job);
        self.store.enqueue(id);
    }

    fn release(&mut self, session: Option<SessionId>) {
        let Some(session) = session else {
            return;
        };
        if !self.store.release_session(session) || !self.store.session_result(session).is_pending() {
            return;
        }
        let result = match self.store.exceeded(session) {
            Some(counterexample) => {
                debug!("session {} exceeded its window: {}", session, counterexample.violation);
                SessionResult::Exceeded(counterexample.clone())
            }
            None => {
                debug!("session {} passed", session);
                SessionResult::Pass
            }
        };
        if self.store.complete_session(session, result) {
            self.resolved.push_back(session);
        }
    }

    fn fail(&mut self, session: Option<SessionId>, counterexample: Counterexample) -> Result<(), Halt> {
        match session {
            None => Err(Halt::Refuted(counterexample)),
            Some(session) if counterexample.violation.is_budget() => {
                trace!("session {} deferred: {}", session, counterexample.violation);
                self.store.record_exceeded(session, counterexample);
                Ok(())
            }
            Some(session) => {
                debug!("session {} failed: {}", session, counterexample.violation);
                if self.store.complete_session(session, SessionResult::Fail(counterexample)) {
                    self.resolved.push_back(session);
                }
                Ok(())
            }
        }
    }

    /// The obligations linked to `link` are exhausted: resume its continuation once.
    fn exhaust(&mut self, link: Option<RevisitId>) -> Result<(), Halt> {
        let Some(link) = link else {
            return Ok(());
        };
        if !self.store.mark_resumed(link) {
            trace!("exhaust: {} already resumed", link);
            return Ok(());
        }
        let revisit = self.store.revisit(link).clone();
        if self.is_resolved(revisit.session) {
            return Ok(());
        }
        trace!("exhaust: resuming {} at {}", link, revisit.node);
        self.execute(revisit.resume.clone(), &Frame::from(&revisit), revisit.parent)
    }

    fn execute(&mut self, obligation: Obligation, frame: &Frame, link: Option<RevisitId>) -> Result<(), Halt> {
        match obligation {
            Obligation::Here(formula) => {
                self.spawn(frame.job(formula, link));
                Ok(())
            }
            Obligation::Successors(formula) => self.fan_out(formula, frame, link, false),
            Obligation::Step(formula) => self.fan_out(formula, frame, link, true),
            Obligation::AddConstraints { formula, window } => {
                let mut job = frame.job(formula, link);
                job.constraints = frame.constraints.merge(&window)?;
                self.spawn(job);
                Ok(())
            }
            Obligation::Revisit { resume, precondition } => self.suspend(*resume, precondition, frame, link),
        }
    }

    fn fan_out(&mut self, formula: Rc<Formula>, frame: &Frame, link: Option<RevisitId>, fresh: bool) -> Result<(), Halt> {
        let graph = self.graph;
        let edges = graph.successors(frame.node);
        if edges.is_empty() {
            warn!("Node {} has no outgoing edge, `{}` holds vacuously", frame.node, formula);
            return self.exhaust(link);
        }
        let mut history = BTreeMap::new();
        if !fresh {
            history = frame.history.clone();
            history.insert(frame.node, frame.cost);
        }
        for edge in edges {
            let mut trace = frame.trace.clone();
            trace.push(edge.to);
            self.spawn(Job {
                node: edge.to,
                formula: formula.clone(),
                history: history.clone(),
                trace,
                cost: frame.cost + edge.cost,
                constraints: frame.constraints.clone(),
                session: frame.session,
                revisit: link,
            });
        }
        Ok(())
    }

    /// Suspends `resume` until `precondition` resolves.
    fn suspend(
        &mut self,
        resume: Obligation,
        precondition: Precondition,
        frame: &Frame,
        link: Option<RevisitId>,
    ) -> Result<(), Halt> {
        let formula = precondition.formula().clone();
        let kind = precondition.kind();

        if formula.is_state_formula() {
            let graph = self.graph;
            let pos = Position {
                id: frame.node,
                node: graph.node(frame.node),
                in_cycle: closes_cycle(&frame.history, frame.node, frame.cost, &frame.constraints),
                cost: frame.cost,
                constraints: &frame.constraints,
            };
            return match (kind, evaluate_local(&formula, &pos)?) {
                (_, Local::Violated(violation))
                | (_, Local::Open(violation))
                | (RevisitKind::Required, Local::Fails(violation)) => {
                    self.fail(frame.session, frame.counterexample(violation))
                }
                (RevisitKind::Required, Local::Holds) | (RevisitKind::Skip, Local::Fails(_)) => {
                    self.execute(resume, frame, link)
                }
                (RevisitKind::Skip, Local::Holds) | (RevisitKind::Ignored, Local::Fails(_)) => self.exhaust(link),
                (RevisitKind::Ignored, Local::Holds) => {
                    let violation = Violation::Holds {
                        formula,
                        node: frame.node,
                    };
                    self.fail(frame.session, frame.counterexample(violation))
                }
            };
        }

        let id = self.store.revisit_for(Revisit {
            node: frame.node,
            resume,
            precondition,
            history: frame.history.clone(),
            trace: frame.trace.clone(),
            cost: frame.cost,
            constraints: frame.constraints.clone(),
            session: frame.session,
            parent: link,
        });
        let root = Job {
            history: BTreeMap::new(),
            session: None,
            revisit: None,
            ..frame.job(formula, None)
        };

        if kind == RevisitKind::Required {
            self.spawn(Job {
                session: frame.session,
                revisit: Some(id),
                ..root
            });
            return Ok(());
        }

        let lookup = self.store.session_id(root.session_key(), id);
        if lookup.created {
            debug!("session {} opened for `{}` at {}", lookup.id, root.formula, root.node);
            self.spawn(Job {
                session: Some(lookup.id),
                ..root
            });
        } else {
            trace!("session {} joined by {}", lookup.id, id);
        }
        let result = self.store.session_result(lookup.id).clone();
        if result.is_pending() {
            if let Some(owner) = frame.session {
                self.store.retain_session(owner);
            }
            Ok(())
        } else {
            self.resume_waiter(id, &result)
        }
    }

    fn notify_resolved(&mut self) -> Result<(), Halt> {
        while let Some(session) = self.resolved.pop_front() {
            let result = self.store.session_result(session).clone();
            for waiter in self.store.take_waiters(session) {
                let owner = self.store.revisit(waiter).session;
                self.resume_waiter(waiter, &result)?;
                self.release(owner);
            }
        }
        Ok(())
    }

    /// Resumes a revisit parked on a resolved session.
    fn resume_waiter(&mut self, id: RevisitId, result: &SessionResult) -> Result<(), Halt> {
        let revisit = self.store.revisit(id).clone();
        if self.is_resolved(revisit.session) {
            trace!("resume_waiter: owner of {} already resolved", id);
            return Ok(());
        }
        let frame = Frame::from(&revisit);
        match (revisit.kind(), result) {
            (RevisitKind::Skip, SessionResult::Pass) | (RevisitKind::Ignored, SessionResult::Fail(_)) => {
                self.exhaust(revisit.parent)
            }
            (RevisitKind::Skip, SessionResult::Fail(_)) => self.execute(revisit.resume, &frame, revisit.parent),
            (RevisitKind::Ignored, SessionResult::Pass) => {
                let violation = Violation::Holds {
                    formula: revisit.precondition.formula().clone(),
                    node: revisit.node,
                };
                self.fail(revisit.session, frame.counterexample(violation))
            }
            (RevisitKind::Skip | RevisitKind::Ignored, SessionResult::Exceeded(counterexample)) => {
                self.fail(revisit.session, counterexample.clone())
            }
            // Required revisits are never parked, and waiters are resumed only once resolved.
            (RevisitKind::Required, _) | (_, SessionResult::Pending) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::atom::RelOp;
    use crate::graph::Node;
    use crate::quantity::Quantity;
    use crate::store::PendingOrder;
    use crate::window::Statement;

    /// `a -> b -> c -> a` with `p` everywhere and `q` only at `c`.
    fn ring() -> KripkeGraph {
        let mut builder = KripkeGraph::builder();
        let a = builder.add_node(Node::new("a").with_var("p", true).with_var("q", false));
        let b = builder.add_node(Node::new("b").with_var("p", true).with_var("q", false));
        let c = builder.add_node(Node::new("c").with_var("p", true).with_var("q", true));
        builder.add_edge(a, b, Cost::of_time(Quantity::ns(10)));
        builder.add_edge(b, c, Cost::of_time(Quantity::ns(10)));
        builder.add_edge(c, a, Cost::of_time(Quantity::ns(10)));
        builder.mark_initial(a);
        builder.build().unwrap()
    }

    fn p() -> Formula {
        Formula::flag("p")
    }

    fn q() -> Formula {
        Formula::flag("q")
    }

    #[test]
    fn test_globally_and_finally() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        assert!(checker.check_formula(&p().ag()).is_ok());
        assert!(checker.check_formula(&q().af()).is_ok());
        assert!(checker.check_formula(&q().ag()).is_err());
        assert!(checker.check_formula(&q().ag().af()).is_err());
        assert!(checker.check_formula(&q().af().ag()).is_ok());
    }

    #[test]
    fn test_counterexample_branch() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        let err = checker.check_formula(&q().not().ag()).unwrap_err();
        let counterexample = err.counterexample().unwrap();
        let c = NodeId::new(2);
        assert_eq!(counterexample.violation.node(), c);
        assert_eq!(counterexample.branch, vec![NodeId::new(0), NodeId::new(1), c]);
        assert!(matches!(err, CheckError::Unsatisfied { index: 0, .. }));
    }

    #[test]
    fn test_next_and_until() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        assert!(checker.check_formula(&q().ax().ax()).is_ok());
        assert!(checker.check_formula(&q().ax()).is_err());
        assert!(checker.check_formula(&p().au(q())).is_ok());
        assert!(checker.check_formula(&q().not().au(q())).is_ok());
        assert!(checker.check_formula(&q().au(p().not())).is_err());
    }

    #[test]
    fn test_boolean_connectives_over_temporal_operands() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        assert!(checker.check_formula(&p().ag().and(q().af())).is_ok());
        assert!(checker.check_formula(&p().ag().and(q().ag())).is_err());
        assert!(checker.check_formula(&q().ag().or(q().af())).is_ok());
        assert!(checker.check_formula(&q().ag().or(p().not().af())).is_err());
        assert!(checker.check_formula(&q().ag().implies(p().not().af())).is_ok());
        assert!(checker.check_formula(&q().af().implies(q().ag())).is_err());
    }

    #[test]
    fn test_negation_reports_refuted_claim() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        let err = checker.check_formula(&q().af().not()).unwrap_err();
        match err.counterexample().map(|c| &c.violation) {
            Some(Violation::Holds { formula, node }) => {
                assert_eq!(**formula, q().af());
                assert_eq!(*node, NodeId::new(0));
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_existential() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        assert!(checker.check_formula(&q().ef()).is_ok());
        assert!(checker.check_formula(&p().eg()).is_ok());
        assert!(checker.check_formula(&q().eg()).is_err());
        assert!(checker.check_formula(&q().ex().ex()).is_ok());
        assert!(checker.check_formula(&p().eu(q())).is_ok());
        assert!(checker.check_formula(&p().not().ef()).is_err());
    }

    #[test]
    fn test_timed_window() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        let within = |op, ns| [Statement::time(op, Quantity::ns(ns))];
        assert!(checker.check_formula(&q().af().within(within(RelOp::Le, 20))).is_ok());
        let err = checker
            .check_formula(&p().ag().within(within(RelOp::Lt, 20)))
            .unwrap_err();
        match err.counterexample().map(|c| &c.violation) {
            Some(Violation::Constraint { statement, cost, .. }) => {
                assert_eq!(statement.op, RelOp::Lt);
                assert_eq!(cost.time, 20_000);
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_breadth_first_store() {
        let graph = ring();
        let store = MemoryStore::new(StoreConfig {
            order: PendingOrder::BreadthFirst,
            ..StoreConfig::default()
        });
        let mut checker = Checker::new(&graph, store, CheckerConfig::default());
        assert!(checker.check_formula(&q().af().ag()).is_ok());
        assert!(checker.check_formula(&p().not().ef()).is_err());
    }

    #[test]
    fn test_malformed_requirement_is_rejected_before_scheduling() {
        let graph = ring();
        let mut checker = Checker::in_memory(&graph);
        let bad = Formula::atom(crate::atom::Atom::var("p", RelOp::Lt, "x")).ag();
        assert!(matches!(checker.check_formula(&bad), Err(CheckError::Malformed(_))));
        assert_eq!(checker.stats().enqueued, 0);

        let unknown = Formula::flag("missing").ag();
        assert!(matches!(
            checker.check_formula(&unknown),
            Err(CheckError::Malformed(MalformedError::UnknownVariable { .. }))
        ));
    }
}
