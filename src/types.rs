//! Type-safe identifiers for graph nodes and store records.
//!
//! Nodes are addressed by their position in the materialized graph (0-indexed).
//! Jobs, revisits and sessions live in the [`JobStore`][crate::store::JobStore]
//! arena and are addressed by the index of their interning table slot (1-indexed,
//! slot 0 is the table sentry).
use std::fmt;

/// A node identifier (0-indexed position in the [`KripkeGraph`][crate::graph::KripkeGraph]).
///
/// Node ids are opaque outside the graph that produced them: two graphs may
/// reuse the same id for structurally different snapshots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node id from the given index.
    pub fn new(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "Node index {} does not fit into u32", index);
        NodeId(index as u32)
    }

    /// Returns the index of the node in the graph.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.index()
    }
}

macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new id from a table slot.
            ///
            /// # Panics
            ///
            /// Panics if `index == 0` (the sentry slot).
            pub fn new(index: usize) -> Self {
                assert_ne!(index, 0, "Store ids must be >= 1");
                assert!(index <= u32::MAX as usize, "Store index {} does not fit into u32", index);
                $name(index as u32)
            }

            /// Returns the table slot of the record.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

store_id!(
    /// A job identifier, handed out by [`JobStore::job_for`][crate::store::JobStore::job_for].
    JobId,
    "j"
);
store_id!(
    /// A revisit (suspended continuation) identifier.
    RevisitId,
    "r"
);
store_id!(
    /// A session (existential sub-search) identifier.
    SessionId,
    "s"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let n0 = NodeId::new(0);
        let n1 = NodeId::new(1);
        assert_eq!(n0.index(), 0);
        assert_eq!(n1.index(), 1);
        assert!(n0 < n1);
        assert_eq!(n1.to_string(), "n1");
    }

    #[test]
    fn test_store_ids() {
        let j = JobId::new(3);
        let r = RevisitId::new(3);
        let s = SessionId::new(3);
        assert_eq!(j.index(), 3);
        assert_eq!(j.to_string(), "j3");
        assert_eq!(r.to_string(), "r3");
        assert_eq!(s.to_string(), "s3");
    }

    #[test]
    #[should_panic(expected = "Store ids must be >= 1")]
    fn test_store_id_zero_panics() {
        JobId::new(0);
    }
}
