//! Kripke graph to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Read nodes** (pre-states) are ellipses, **write nodes** (post-states) are boxes
//! - **Initial nodes** are drawn with a bold outline
//! - **Edges** are labeled with their cost unless it is zero
//! - An optional **branch** (e.g. a counterexample) is highlighted in color
//!
//! # Examples
//!
//! ```
//! use tctl_rs::graph::{KripkeGraph, Node};
//! use tctl_rs::quantity::Cost;
//!
//! let mut builder = KripkeGraph::builder();
//! let a = builder.add_node(Node::new("idle"));
//! builder.add_edge(a, a, Cost::ZERO);
//! builder.mark_initial(a);
//! let graph = builder.build().unwrap();
//!
//! let dot = graph.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph {"));
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::Counterexample;
use crate::graph::{KripkeGraph, NodeKind};
use crate::types::NodeId;

/// Configuration options for DOT output generation.
///
/// ```
/// use tctl_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     show_vars: false,
///     ..DotConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for read nodes (default: "ellipse")
    pub read_shape: &'static str,
    /// Shape for write nodes (default: "box")
    pub write_shape: &'static str,
    /// Style for initial nodes (default: "bold")
    pub initial_style: &'static str,
    /// Color of the highlighted branch (default: "red")
    pub highlight_color: &'static str,
    /// Whether to print the variable assignment in node labels (default: true)
    pub show_vars: bool,
    /// Whether to label edges with non-zero costs (default: true)
    pub show_costs: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            read_shape: "ellipse",
            write_shape: "box",
            initial_style: "bold",
            highlight_color: "red",
            show_vars: true,
            show_costs: true,
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl KripkeGraph {
    /// Converts the graph to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&[], &DotConfig::default())
    }

    /// Converts the graph to DOT format, highlighting the counterexample branch.
    pub fn counterexample_to_dot(&self, counterexample: &Counterexample) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&counterexample.branch, &DotConfig::default())
    }

    /// Converts the graph to DOT format, highlighting the nodes of `branch` and the
    /// edges between consecutive nodes of `branch`.
    pub fn to_dot_with_config(&self, branch: &[NodeId], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let on_branch: BTreeSet<NodeId> = branch.iter().copied().collect();
        let steps: BTreeSet<(NodeId, NodeId)> = branch.windows(2).map(|w| (w[0], w[1])).collect();

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;

        for id in self.node_ids() {
            let node = self.node(id);
            let shape = match node.kind {
                NodeKind::Read => config.read_shape,
                NodeKind::Write => config.write_shape,
            };
            let mut label = format!("{}: {} -> {}", id, node.current, node.target);
            if node.execute_on_entry {
                label.push_str(" (entry)");
            }
            if config.show_vars && !node.vars.is_empty() {
                label.push_str("\\n");
                label.push_str(&escape(&node.compact_vars()));
            }
            write!(dot, "{} [shape={}, label=\"{}\"", id, shape, label)?;
            if self.initial().contains(&id) {
                write!(dot, ", style={}", config.initial_style)?;
            }
            if on_branch.contains(&id) {
                write!(dot, ", color={}", config.highlight_color)?;
            }
            writeln!(dot, "];")?;
        }

        for from in self.node_ids() {
            for edge in self.successors(from) {
                write!(dot, "{} -> {}", from, edge.to)?;
                let mut attributes = Vec::new();
                if config.show_costs && !edge.cost.is_zero() {
                    attributes.push(format!("label=\"{}\"", edge.cost));
                }
                if steps.contains(&(from, edge.to)) {
                    attributes.push(format!("color={}", config.highlight_color));
                    attributes.push("penwidth=2".to_string());
                }
                if attributes.is_empty() {
                    writeln!(dot, ";")?;
                } else {
                    writeln!(dot, " [{}];", attributes.join(", "))?;
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use crate::quantity::{Cost, Quantity};

    fn graph() -> KripkeGraph {
        let mut builder = KripkeGraph::builder();
        let a = builder.add_node(Node::new("idle").with_var("mode", "slow"));
        let b = builder.add_node(Node::new("busy").with_kind(NodeKind::Write));
        builder.add_edge(a, b, Cost::of_time(Quantity::ns(3)));
        builder.add_edge(b, a, Cost::ZERO);
        builder.mark_initial(a);
        builder.build().unwrap()
    }

    #[test]
    fn test_to_dot_basic() {
        let dot = graph().to_dot().unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("n0 [shape=ellipse"));
        assert!(dot.contains("n1 [shape=box"));
        assert!(dot.contains("style=bold"));
        assert!(dot.contains("mode=\\\"slow\\\""));
        assert!(dot.contains("n1 -> n0;"));
    }

    #[test]
    fn test_highlighted_branch() {
        let graph = graph();
        let branch = [NodeId::new(0), NodeId::new(1)];
        let dot = graph.to_dot_with_config(&branch, &DotConfig::default()).unwrap();
        assert!(dot.contains("n0 -> n1 [label=\"{t = 3000ps, e = 0pJ}\", color=red, penwidth=2];"));
        assert!(dot.contains("n1 -> n0;"));
    }

    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            show_vars: false,
            show_costs: false,
            ..DotConfig::default()
        };
        let dot = graph().to_dot_with_config(&[], &config).unwrap();
        assert!(!dot.contains("mode"));
        assert!(dot.contains("n0 -> n1;"));
    }
}
