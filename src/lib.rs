//! # tctl-rs: Explicit-state TCTL model checking
//!
//! **`tctl-rs`** decides whether an explicit Kripke structure, materialized from simulated
//! runs of a hardware state machine, satisfies a specification written in branching-time
//! temporal logic, optionally bounded by physical budgets (elapsed time, consumed energy).
//!
//! ## What is checked?
//!
//! A specification is a list of TCTL formulas. Each formula combines atomic propositions over
//! the state variables of a node with boolean connectives, path quantifiers (**A**ll paths,
//! **E**xists a path) and path operators (ne**X**t, **F**inally, **G**lobally, **U**ntil,
//! **W**eak until). A formula can be wrapped in a *window* such as `{AF done}_{t <= 100ns}`,
//! which bounds the cost accumulated along every branch.
//!
//! ## Key Features
//!
//! - **One universal engine**: existential formulas are rewritten to their universal duals
//!   ([`to_universal`][crate::formula::to_universal]) before scheduling, and existential
//!   witnessing is realized through shared sub-searches (*sessions*).
//! - **Guaranteed termination**: every (node, formula, cycle flag, window, continuation) is
//!   decomposed at most once.
//! - **Counterexamples**: a violated requirement is reported with the full branch from an
//!   initial node to the offending node, and the violated window statement if any.
//! - **Pluggable storage**: all scheduler state lives behind the [`JobStore`][crate::store::JobStore]
//!   trait; [`MemoryStore`][crate::store::MemoryStore] is the in-memory implementation.
//!
//! ## Basic Usage
//!
//! ```rust
//! use tctl_rs::atom::RelOp;
//! use tctl_rs::checker::{Checker, Specification};
//! use tctl_rs::formula::Formula;
//! use tctl_rs::graph::{KripkeGraph, Node};
//! use tctl_rs::quantity::{Cost, Quantity};
//! use tctl_rs::window::Statement;
//!
//! // 1. Build (or materialize) a graph
//! let mut builder = KripkeGraph::builder();
//! let idle = builder.add_node(Node::new("idle").with_var("done", false));
//! let work = builder.add_node(Node::new("work").with_var("done", true));
//! builder.add_edge(idle, work, Cost::of_time(Quantity::ns(40)));
//! builder.add_edge(work, idle, Cost::of_time(Quantity::ns(10)));
//! builder.mark_initial(idle);
//! let graph = builder.build().unwrap();
//!
//! // 2. Write the requirements
//! let done = Formula::flag("done");
//! let spec = Specification::new()
//!     .with(done.clone().af().ag())
//!     .with(done.clone().af().within([Statement::time(RelOp::Le, Quantity::ns(50))]));
//!
//! // 3. Check
//! let mut checker = Checker::in_memory(&graph);
//! assert!(checker.check(&spec).is_ok());
//!
//! // Too tight a budget yields a counterexample
//! let tight = done.af().within([Statement::time(RelOp::Lt, Quantity::ns(40))]);
//! let err = checker.check_formula(&tight).unwrap_err();
//! assert_eq!(err.counterexample().unwrap().branch.len(), 2);
//! ```
//!
//! ## Core Components
//!
//! - **[`checker`]**: the job scheduler and the [`Specification`][crate::checker::Specification] input.
//! - **[`decompose`]**: the one-step semantics of every operator.
//! - **[`window`]**: constraint windows over accumulated cost.
//! - **[`materialize`]**: building graphs from simulated ringlets.
//! - **[`dot`]**: Graphviz export, with counterexample highlighting.

pub mod atom;
pub mod cache;
pub mod checker;
pub mod decompose;
pub mod dot;
pub mod error;
pub mod formula;
pub mod graph;
pub mod job;
pub mod materialize;
pub mod quantity;
pub mod store;
pub mod table;
pub mod types;
pub mod window;
