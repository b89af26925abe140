//! Graph Materializer: builds a [`KripkeGraph`] from simulated ringlets.
//!
//! Every ringlet contributes a read node (its pre-state) and a write node (its
//! post-state), both deduplicated by structural equality, and an edge between
//! them carrying the ringlet cost. Every write node is then linked at zero cost
//! to every compatible read node. A read node `Q` is compatible with a write
//! node `P` when
//!
//! - `Q` rests in the control state `P` moves to (`Q.current == P.target`),
//! - `Q` executes the entry action iff `P` changes state
//!   (`Q.execute_on_entry == (P.target != P.current)`),
//! - every variable present in both snapshots has the same value.

use std::collections::BTreeMap;

use log::debug;

use crate::error::GraphError;
use crate::graph::{KripkeGraph, Node, NodeKind, Value};
use crate::quantity::Cost;
use crate::types::NodeId;

/// A state of the simulated machine, as recorded by the simulator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Snapshot {
    pub vars: BTreeMap<String, Value>,
    pub execute_on_entry: bool,
    pub current: String,
    pub target: String,
}

impl Snapshot {
    pub fn new(current: impl Into<String>, target: impl Into<String>) -> Self {
        Snapshot {
            vars: BTreeMap::new(),
            execute_on_entry: false,
            current: current.into(),
            target: target.into(),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_entry(mut self, execute_on_entry: bool) -> Self {
        self.execute_on_entry = execute_on_entry;
        self
    }

    fn to_node(&self, kind: NodeKind) -> Node {
        Node {
            vars: self.vars.clone(),
            execute_on_entry: self.execute_on_entry,
            current: self.current.clone(),
            target: self.target.clone(),
            kind,
        }
    }
}

/// One simulated execution step.
#[derive(Debug, Clone)]
pub struct Ringlet {
    pub pre: Snapshot,
    pub post: Snapshot,
    pub cost: Cost,
}

impl Ringlet {
    pub fn new(pre: Snapshot, post: Snapshot, cost: Cost) -> Self {
        Ringlet { pre, post, cost }
    }
}

fn is_compatible(post: &Node, pre: &Node) -> bool {
    pre.current == post.target
        && pre.execute_on_entry == (post.target != post.current)
        && post
            .vars
            .iter()
            .all(|(name, value)| pre.vars.get(name).map_or(true, |v| v == value))
}

/// Builds the graph of `ringlets`, starting from the read nodes of `initial`.
pub fn materialize(ringlets: &[Ringlet], initial: &[Snapshot]) -> Result<KripkeGraph, GraphError> {
    let mut builder = KripkeGraph::builder();
    let mut reads: Vec<NodeId> = Vec::new();
    let mut writes: Vec<NodeId> = Vec::new();

    for ringlet in ringlets {
        let pre = builder.add_node(ringlet.pre.to_node(NodeKind::Read));
        let post = builder.add_node(ringlet.post.to_node(NodeKind::Write));
        builder.add_edge(pre, post, ringlet.cost);
        if !reads.contains(&pre) {
            reads.push(pre);
        }
        if !writes.contains(&post) {
            writes.push(post);
        }
    }

    for &post in &writes {
        let targets: Vec<NodeId> = reads
            .iter()
            .copied()
            .filter(|&pre| is_compatible(builder.node(post), builder.node(pre)))
            .collect();
        if targets.is_empty() {
            let node = builder.node(post);
            return Err(GraphError::DeadEnd {
                snapshot: node.to_string(),
                target: node.target.clone(),
            });
        }
        for pre in targets {
            builder.add_edge(post, pre, Cost::ZERO);
        }
    }

    for snapshot in initial {
        let node = snapshot.to_node(NodeKind::Read);
        match builder.find(&node) {
            Some(id) => builder.mark_initial(id),
            None => {
                return Err(GraphError::UnknownInitial {
                    snapshot: node.to_string(),
                })
            }
        }
    }

    debug!(
        "materialize: {} ringlets -> {} nodes ({} read, {} write)",
        ringlets.len(),
        builder.len(),
        reads.len(),
        writes.len()
    );
    builder.build()
}
