//! The Job Store: the pluggable boundary owning all scheduler state.
//!
//! A store interns jobs by content, keeps the pending worklist, the cycle cache,
//! the revisit arena and the session table. The [`Checker`][crate::checker::Checker]
//! only ever refers to records by id, so a store may keep them anywhere (in
//! memory, or in a transactional backend for state spaces exceeding memory) as
//! long as it provides the same dedup and session semantics.
//!
//! [`MemoryStore`] is the in-memory implementation.

mod memory;

pub use memory::MemoryStore;

use crate::error::Counterexample;
use crate::job::{CycleKey, Job, Revisit, SessionKey, SessionResult};
use crate::types::{JobId, RevisitId, SessionId};

/// Order in which pending jobs are popped. Both orders are deterministic.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PendingOrder {
    /// LIFO: explore one branch to its end first.
    #[default]
    DepthFirst,
    /// FIFO: explore level by level, yielding shortest counterexamples first.
    BreadthFirst,
}

/// Configuration of a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub order: PendingOrder,
    /// Initial table sizes are `2^bucket_bits`.
    pub bucket_bits: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            order: PendingOrder::DepthFirst,
            bucket_bits: 12,
        }
    }
}

/// Result of [`JobStore::session_id`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionLookup {
    pub id: SessionId,
    /// The session did not exist before; its root job has to be scheduled.
    pub created: bool,
}

/// Counters describing one run.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StoreStats {
    /// Distinct jobs interned.
    pub jobs: usize,
    /// Jobs pushed to the worklist.
    pub enqueued: usize,
    /// Jobs dropped by the cycle cache.
    pub duplicates: usize,
    /// Jobs decomposed.
    pub decomposed: usize,
    pub revisits: usize,
    pub sessions: usize,
    /// Waiters parked on already existing sessions.
    pub shared_sessions: usize,
}

pub trait JobStore {
    /// Creates or finds a job by full content equality.
    fn job_for(&mut self, job: Job) -> JobId;
    fn job(&self, id: JobId) -> &Job;

    fn enqueue(&mut self, id: JobId);
    fn next_pending(&mut self) -> Option<JobId>;

    /// Test-and-insert into the cycle cache. Returns `true` if `key` was seen before.
    fn seen_cycle(&mut self, key: CycleKey) -> bool;

    fn revisit_for(&mut self, revisit: Revisit) -> RevisitId;
    fn revisit(&self, id: RevisitId) -> &Revisit;
    /// Test-and-set of the resumed flag. Returns `true` only the first time.
    fn mark_resumed(&mut self, id: RevisitId) -> bool;

    /// Creates or finds the session for `key`. While the session is pending,
    /// `waiter` is registered to be resumed with its outcome.
    fn session_id(&mut self, key: SessionKey, waiter: RevisitId) -> SessionLookup;
    fn session_result(&self, id: SessionId) -> &SessionResult;
    /// Commits the outcome of a pending session. Returns `false` if the session
    /// was already resolved, in which case nothing changes.
    fn complete_session(&mut self, id: SessionId, result: SessionResult) -> bool;
    /// Remembers a branch of a pending session that ran out of its window. Only
    /// the first one is kept.
    fn record_exceeded(&mut self, id: SessionId, counterexample: Counterexample);
    fn exceeded(&self, id: SessionId) -> Option<&Counterexample>;
    /// Removes and returns the waiters parked on a session.
    fn take_waiters(&mut self, id: SessionId) -> Vec<RevisitId>;
    /// Records one more outstanding job or waiter for the session.
    fn retain_session(&mut self, id: SessionId);
    /// Drops one outstanding job or waiter. Returns `true` when none is left.
    fn release_session(&mut self, id: SessionId) -> bool;
    fn pending_sessions(&self) -> usize;

    /// Counts a job that survived the cycle cache.
    fn record_decomposed(&mut self);

    /// Clears all state for reuse.
    fn reset(&mut self);
    fn stats(&self) -> StoreStats;
}
