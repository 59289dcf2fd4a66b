//! Graph export for external tree drawing.
//!
//! The core does no layout. It hands out a node list (one label per arena
//! slot; blank for internal nodes) and an edge list `(parent, child, bit)`,
//! and can format both as Graphviz DOT text.

use crate::tree::{CodeTree, NodeKind};
use std::fmt::Write;

/// One node for drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Arena index
    pub index: usize,

    /// Leaf symbol; `None` for internal nodes
    pub symbol: Option<char>,
}

impl GraphNode {
    /// Printable label. Whitespace symbols get visible stand-ins; internal
    /// nodes are blank.
    pub fn label(&self) -> String {
        match self.symbol {
            None => String::new(),
            Some(' ') => "[ ]".to_string(),
            Some('\n') => "\\n".to_string(),
            Some('\t') => "\\t".to_string(),
            Some('\r') => "\\r".to_string(),
            Some(c) => c.to_string(),
        }
    }
}

/// One edge for drawing: `bit` is 0 for a left child, 1 for a right child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub parent: usize,
    pub child: usize,
    pub bit: u8,
}

/// Nodes and edges of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Extract the drawable graph. Edges are listed from the root down.
pub fn graph(tree: &CodeTree) -> TreeGraph {
    let nodes = tree
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| GraphNode {
            index,
            symbol: node.symbol(),
        })
        .collect();

    let mut edges = Vec::with_capacity(tree.node_count().saturating_sub(1));
    for (parent, node) in tree.nodes().iter().enumerate().rev() {
        if let NodeKind::Internal { left, right } = node.kind() {
            edges.push(GraphEdge { parent, child: left, bit: 0 });
            edges.push(GraphEdge { parent, child: right, bit: 1 });
        }
    }

    TreeGraph { nodes, edges }
}

/// Render the tree as Graphviz DOT (left-to-right, circle nodes).
pub fn to_dot(tree: &CodeTree) -> String {
    let graph = graph(tree);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "digraph {{");
    let _ = writeln!(out, "    graph [rankdir=LR];");
    let _ = writeln!(out, "    node [shape=circle, fontsize=20];");
    for node in &graph.nodes {
        let _ = writeln!(out, "    {} [label=\"{}\"];", node.index, escape_dot(&node.label()));
    }
    for edge in &graph.edges {
        let _ = writeln!(out, "    {} -> {} [label=\"{}\"];", edge.parent, edge.child, edge.bit);
    }
    out.push_str("}\n");
    out
}

fn escape_dot(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}
