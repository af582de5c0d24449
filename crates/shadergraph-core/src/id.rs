//! Stable ID newtypes for graph entities.
//!
//! Node ids are handed out by [`ShaderGraph`](crate::graph::ShaderGraph) from
//! a running counter and are never reused, so per-pass flag arrays can be
//! indexed by id and sized by the counter. Socket references pair a node id
//! with the socket's position in that node's input or output list.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within one graph's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The Output node is always the first node of every graph.
    pub const OUTPUT: NodeId = NodeId(0);

    /// Returns the id as an index into per-pass flag arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference to an input socket: `(node, position in node.inputs)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputRef {
    pub node: NodeId,
    pub slot: u16,
}

/// Reference to an output socket: `(node, position in node.outputs)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub node: NodeId,
    pub slot: u16,
}

impl InputRef {
    pub fn new(node: NodeId, slot: usize) -> Self {
        debug_assert!(slot <= u16::MAX as usize, "socket slot {} exceeds u16", slot);
        InputRef {
            node,
            slot: slot as u16,
        }
    }

    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

impl OutputRef {
    pub fn new(node: NodeId, slot: usize) -> Self {
        debug_assert!(slot <= u16::MAX as usize, "socket slot {} exceeds u16", slot);
        OutputRef {
            node,
            slot: slot as u16,
        }
    }

    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.in[{}]", self.node, self.slot)
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.out[{}]", self.node, self.slot)
    }
}

// Bridge for the petgraph topology view, which is built densely by id.

impl From<NodeId> for NodeIndex<u32> {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.index())
    }
}
