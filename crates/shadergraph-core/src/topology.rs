//! A petgraph view of the link structure.
//!
//! The arena is the source of truth; this view is rebuilt on demand for
//! algorithms petgraph already provides (cycle checks, Graphviz output).

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::ShaderGraph;
use crate::id::{InputRef, NodeId, OutputRef};

/// Edge payload: which sockets a link joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEdge {
    pub from: OutputRef,
    pub to: InputRef,
}

/// Directed graph of nodes (weights are node ids) with one edge per link,
/// pointing from producer to consumer.
pub struct LinkGraph {
    pub graph: DiGraph<NodeId, LinkEdge>,
    pub index: HashMap<NodeId, NodeIndex>,
}

impl LinkGraph {
    pub fn build(shader: &ShaderGraph) -> Self {
        let mut graph = DiGraph::with_capacity(shader.node_count(), shader.link_count());
        let mut index = HashMap::with_capacity(shader.node_count());

        for node in shader.nodes() {
            index.insert(node.id(), graph.add_node(node.id()));
        }

        for node in shader.nodes() {
            for (slot, input) in node.inputs().iter().enumerate() {
                let Some(from) = input.link() else { continue };
                if let (Some(&a), Some(&b)) = (index.get(&from.node), index.get(&node.id())) {
                    graph.add_edge(
                        a,
                        b,
                        LinkEdge {
                            from,
                            to: InputRef::new(node.id(), slot),
                        },
                    );
                }
            }
        }

        LinkGraph { graph, index }
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }
}

/// True when the graph's links contain no cycle.
pub fn is_acyclic(shader: &ShaderGraph) -> bool {
    LinkGraph::build(shader).is_acyclic()
}
