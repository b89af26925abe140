use std::collections::VecDeque;

use log::trace;

use crate::cache::CycleCache;
use crate::error::Counterexample;
use crate::job::{CycleKey, Job, Revisit, SessionKey, SessionResult};
use crate::store::{JobStore, PendingOrder, SessionLookup, StoreConfig, StoreStats};
use crate::table::Table;
use crate::types::{JobId, RevisitId, SessionId};

struct RevisitEntry {
    revisit: Revisit,
    resumed: bool,
}

struct SessionState {
    result: SessionResult,
    waiters: Vec<RevisitId>,
    /// Queued jobs plus parked waiters belonging to the session.
    outstanding: usize,
    exceeded: Option<Counterexample>,
}

/// Job store backed by interning tables and vectors.
pub struct MemoryStore {
    config: StoreConfig,
    jobs: Table<Job>,
    pending: VecDeque<JobId>,
    cycles: CycleCache<CycleKey>,
    revisits: Vec<RevisitEntry>,
    session_keys: Table<SessionKey>,
    sessions: Vec<SessionState>,
    enqueued: usize,
    decomposed: usize,
    shared_sessions: usize,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let bits = config.bucket_bits;
        Self {
            config,
            jobs: Table::new(bits),
            pending: VecDeque::new(),
            cycles: CycleCache::new(bits),
            revisits: Vec::new(),
            session_keys: Table::new(bits),
            sessions: Vec::new(),
            enqueued: 0,
            decomposed: 0,
            shared_sessions: 0,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn session(&self, id: SessionId) -> &SessionState {
        &self.sessions[id.index() - 1]
    }

    fn session_mut(&mut self, id: SessionId) -> &mut SessionState {
        &mut self.sessions[id.index() - 1]
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(StoreConfig::default())
    }
}

impl JobStore for MemoryStore {
    fn job_for(&mut self, job: Job) -> JobId {
        let (index, _) = self.jobs.put(job);
        JobId::new(index)
    }

    fn job(&self, id: JobId) -> &Job {
        self.jobs.value(id.index())
    }

    fn enqueue(&mut self, id: JobId) {
        self.enqueued += 1;
        self.pending.push_back(id);
    }

    fn next_pending(&mut self) -> Option<JobId> {
        match self.config.order {
            PendingOrder::DepthFirst => self.pending.pop_back(),
            PendingOrder::BreadthFirst => self.pending.pop_front(),
        }
    }

    fn seen_cycle(&mut self, key: CycleKey) -> bool {
        self.cycles.seen(key)
    }

    fn revisit_for(&mut self, revisit: Revisit) -> RevisitId {
        self.revisits.push(RevisitEntry {
            revisit,
            resumed: false,
        });
        RevisitId::new(self.revisits.len())
    }

    fn revisit(&self, id: RevisitId) -> &Revisit {
        &self.revisits[id.index() - 1].revisit
    }

    fn mark_resumed(&mut self, id: RevisitId) -> bool {
        let entry = &mut self.revisits[id.index() - 1];
        !std::mem::replace(&mut entry.resumed, true)
    }

    fn session_id(&mut self, key: SessionKey, waiter: RevisitId) -> SessionLookup {
        let (index, created) = self.session_keys.put(key);
        let id = SessionId::new(index);
        if created {
            self.sessions.push(SessionState {
                result: SessionResult::Pending,
                waiters: Vec::new(),
                outstanding: 0,
                exceeded: None,
            });
        } else {
            self.shared_sessions += 1;
        }
        let state = self.session_mut(id);
        if state.result.is_pending() {
            state.waiters.push(waiter);
        }
        SessionLookup { id, created }
    }

    fn session_result(&self, id: SessionId) -> &SessionResult {
        &self.session(id).result
    }

    fn complete_session(&mut self, id: SessionId, result: SessionResult) -> bool {
        let state = self.session_mut(id);
        if !state.result.is_pending() {
            trace!("session {} already resolved", id);
            return false;
        }
        state.result = result;
        true
    }

    fn record_exceeded(&mut self, id: SessionId, counterexample: Counterexample) {
        let state = self.session_mut(id);
        if state.exceeded.is_none() {
            state.exceeded = Some(counterexample);
        }
    }

    fn exceeded(&self, id: SessionId) -> Option<&Counterexample> {
        self.session(id).exceeded.as_ref()
    }

    fn take_waiters(&mut self, id: SessionId) -> Vec<RevisitId> {
        std::mem::take(&mut self.session_mut(id).waiters)
    }

    fn retain_session(&mut self, id: SessionId) {
        self.session_mut(id).outstanding += 1;
    }

    fn release_session(&mut self, id: SessionId) -> bool {
        let state = self.session_mut(id);
        assert!(state.outstanding > 0, "Session {} released more often than retained", id);
        state.outstanding -= 1;
        state.outstanding == 0
    }

    fn pending_sessions(&self) -> usize {
        self.sessions.iter().filter(|s| s.result.is_pending()).count()
    }

    fn record_decomposed(&mut self) {
        self.decomposed += 1;
    }

    fn reset(&mut self) {
        self.jobs.clear();
        self.pending.clear();
        self.cycles.clear();
        self.revisits.clear();
        self.session_keys.clear();
        self.sessions.clear();
        self.enqueued = 0;
        self.decomposed = 0;
        self.shared_sessions = 0;
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            jobs: self.jobs.len(),
            enqueued: self.enqueued,
            duplicates: self.cycles.hits(),
            decomposed: self.decomposed,
            revisits: self.revisits.len(),
            sessions: self.sessions.len(),
            shared_sessions: self.shared_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::decompose::{Obligation, Precondition};
    use crate::error::{Counterexample, Violation};
    use crate::formula::Formula;
    use crate::types::NodeId;

    fn job(node: usize) -> Job {
        Job::root(NodeId::new(node), Rc::new(Formula::flag("p").af()))
    }

    fn revisit() -> Revisit {
        let p = Rc::new(Formula::flag("p"));
        let j = job(0);
        Revisit {
            node: j.node,
            resume: Obligation::Successors(j.formula.clone()),
            precondition: Precondition::Skip(p),
            history: j.history,
            trace: j.trace,
            cost: j.cost,
            constraints: j.constraints,
            session: None,
            parent: None,
        }
    }

    #[test]
    fn test_jobs_are_interned() {
        let mut store = MemoryStore::default();
        let a = store.job_for(job(0));
        let b = store.job_for(job(1));
        let c = store.job_for(job(0));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(store.job(b).node, NodeId::new(1));
        assert_eq!(store.stats().jobs, 2);
    }

    #[test]
    fn test_pending_order() {
        let mut dfs = MemoryStore::default();
        let mut bfs = MemoryStore::new(StoreConfig {
            order: PendingOrder::BreadthFirst,
            ..StoreConfig::default()
        });
        for store in [&mut dfs, &mut bfs] {
            let a = store.job_for(job(0));
            let b = store.job_for(job(1));
            store.enqueue(a);
            store.enqueue(b);
        }
        assert_eq!(dfs.next_pending().map(|id| dfs.job(id).node), Some(NodeId::new(1)));
        assert_eq!(bfs.next_pending().map(|id| bfs.job(id).node), Some(NodeId::new(0)));
        dfs.next_pending();
        assert_eq!(dfs.next_pending(), None);
    }

    #[test]
    fn test_cycle_cache() {
        let mut store = MemoryStore::default();
        assert!(!store.seen_cycle(job(0).cycle_key()));
        assert!(store.seen_cycle(job(0).cycle_key()));
        assert!(!store.seen_cycle(job(1).cycle_key()));
        assert_eq!(store.stats().duplicates, 1);
    }

    #[test]
    fn test_revisit_resumes_once() {
        let mut store = MemoryStore::default();
        let r = store.revisit_for(revisit());
        assert!(store.mark_resumed(r));
        assert!(!store.mark_resumed(r));
    }

    #[test]
    fn test_sessions_are_shared_and_commit_once() {
        let mut store = MemoryStore::default();
        let w1 = store.revisit_for(revisit());
        let w2 = store.revisit_for(revisit());
        let key = job(0).session_key();

        let first = store.session_id(key.clone(), w1);
        let second = store.session_id(key, w2);
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.pending_sessions(), 1);

        store.retain_session(first.id);
        store.retain_session(first.id);
        assert!(!store.release_session(first.id));
        assert!(store.release_session(first.id));

        let failure = SessionResult::Fail(Counterexample {
            violation: Violation::NoWitness {
                formula: Rc::new(Formula::flag("p").af()),
                node: NodeId::new(0),
            },
            branch: vec![NodeId::new(0)],
        });
        assert!(store.complete_session(first.id, SessionResult::Pass));
        assert!(!store.complete_session(first.id, failure));
        assert_eq!(*store.session_result(first.id), SessionResult::Pass);
        assert_eq!(store.take_waiters(first.id), vec![w1, w2]);
        assert_eq!(store.pending_sessions(), 0);

        // Joining a resolved session does not park the waiter.
        let w3 = store.revisit_for(revisit());
        let third = store.session_id(job(0).session_key(), w3);
        assert_eq!(third.id, first.id);
        assert!(store.take_waiters(first.id).is_empty());
    }

    #[test]
    fn test_first_exceeded_branch_is_kept() {
        let mut store = MemoryStore::default();
        let w = store.revisit_for(revisit());
        let session = store.session_id(job(0).session_key(), w).id;
        assert_eq!(store.exceeded(session), None);

        let at = |node: usize| Counterexample {
            violation: Violation::NoWitness {
                formula: Rc::new(Formula::flag("p").af()),
                node: NodeId::new(node),
            },
            branch: vec![NodeId::new(node)],
        };
        store.record_exceeded(session, at(1));
        store.record_exceeded(session, at(2));
        assert_eq!(store.exceeded(session), Some(&at(1)));
        assert!(store.session_result(session).is_pending());
    }

    #[test]
    fn test_reset() {
        let mut store = MemoryStore::default();
        let a = store.job_for(job(0));
        store.enqueue(a);
        store.seen_cycle(job(0).cycle_key());
        store.reset();
        assert_eq!(store.next_pending(), None);
        assert_eq!(store.stats(), StoreStats::default());
        assert!(!store.seen_cycle(job(0).cycle_key()));
    }
}
