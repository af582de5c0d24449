//! Core error types for shadergraph-core.
//!
//! [`CoreError`] covers contract violations of the graph primitives: stale
//! node ids, socket names that a node does not have, and link operations on
//! sockets in the wrong state. Recoverable authoring problems (double links,
//! closure conversions, cycles) are not errors; they are reported as
//! [`GraphDiagnostic`](crate::diagnostics::GraphDiagnostic)s.

use crate::id::NodeId;
use thiserror::Error;

/// Core errors produced by the shadergraph-core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// The node has no input socket with this name.
    #[error("node {node} has no input named '{name}'")]
    UnknownInput { node: NodeId, name: String },

    /// The node has no output socket with this name.
    #[error("node {node} has no output named '{name}'")]
    UnknownOutput { node: NodeId, name: String },

    /// A socket reference points past the end of the node's socket list.
    #[error("socket slot {slot} out of range on node {node}")]
    SocketOutOfRange { node: NodeId, slot: usize },

    /// `disconnect_input` was called on an input without a link.
    #[error("input '{input}' of node {node} is not linked")]
    InputNotLinked { node: NodeId, input: String },

    /// The two ends of a link disagree.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
