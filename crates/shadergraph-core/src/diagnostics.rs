//! Recoverable problems found while authoring or compiling a graph.
//!
//! None of these abort anything. The graph records each one (see
//! [`ShaderGraph::diagnostics`](crate::graph::ShaderGraph::diagnostics)) and
//! logs it through `tracing`, and the operation that found it continues with
//! a well-defined fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::NodeId;
use crate::socket::SocketType;

/// A recoverable graph problem.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphDiagnostic {
    /// `connect` target already has a link; the existing link is kept.
    #[error("input '{input}' of node {node} is already connected")]
    InputAlreadyLinked { node: NodeId, input: String },

    /// A closure output cannot be converted to another socket type.
    #[error(
        "cannot connect closure output '{output}' of node {from} to {to_type:?} input '{input}' of node {to}"
    )]
    ClosureConversion {
        from: NodeId,
        output: String,
        to: NodeId,
        input: String,
        to_type: SocketType,
    },

    /// The target socket only accepts literals.
    #[error("input '{input}' of node {node} is not linkable")]
    NotLinkable { node: NodeId, input: String },

    /// A back-edge was removed to make the graph acyclic.
    #[error("cycle detected: removed link into input '{input}' of node {node}")]
    CycleBroken { node: NodeId, input: String },

    /// Nothing upstream of the volume output can produce a volume.
    #[error("volume output has no volume-capable node upstream; disconnected")]
    VolumeDisconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_socket() {
        let d = GraphDiagnostic::InputAlreadyLinked {
            node: NodeId(3),
            input: "Color".into(),
        };
        assert_eq!(d.to_string(), "input 'Color' of node 3 is already connected");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let d = GraphDiagnostic::CycleBroken {
            node: NodeId(1),
            input: "Value1".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "cycle_broken");
        assert_eq!(json["node"], 1);
    }
}
