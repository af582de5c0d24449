//! Cycle breaking and dead node removal.
//!
//! Both work from the same roots: the Output node followed by every AOV
//! output. A single depth-first walk severs back-edges and records which
//! nodes are reachable; everything else is dropped.

use shadergraph_core::{GraphDiagnostic, InputRef, NodeId, NodeSet, ShaderGraph, SpecialType};

use super::NodeFlags;
use crate::error::CompileError;

struct Frame {
    node: NodeId,
    next_input: usize,
}

/// Severs every link that closes a cycle reachable from an output root.
///
/// Returns the set of visited nodes. The removed edge is the first back-edge
/// met in node and input declaration order, which is not canonical: a
/// different insertion order may cut the same cycle elsewhere.
pub fn break_cycles(graph: &mut ShaderGraph) -> Result<NodeFlags, CompileError> {
    let mut visited = NodeFlags::new(graph);
    let mut on_stack = NodeFlags::new(graph);

    let aov_roots: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.special_type() == SpecialType::OutputAov)
        .map(|n| n.id())
        .collect();

    for root in std::iter::once(NodeId::OUTPUT).chain(aov_roots) {
        if !visited.get(root) {
            visit(graph, root, &mut visited, &mut on_stack)?;
        }
    }
    Ok(visited)
}

fn visit(
    graph: &mut ShaderGraph,
    root: NodeId,
    visited: &mut NodeFlags,
    on_stack: &mut NodeFlags,
) -> Result<(), CompileError> {
    visited.set(root);
    on_stack.set(root);
    let mut stack = vec![Frame {
        node: root,
        next_input: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let id = frame.node;
        let slot = frame.next_input;
        if slot >= graph.node(id)?.inputs().len() {
            on_stack.clear(id);
            stack.pop();
            continue;
        }
        frame.next_input += 1;

        let input = InputRef::new(id, slot);
        let Some(upstream) = graph.link_of(input)? else {
            continue;
        };

        if on_stack.get(upstream.node) {
            let name = graph.input(input)?.name.clone();
            graph.disconnect_input(input)?;
            graph.report(GraphDiagnostic::CycleBroken { node: id, input: name });
        } else if !visited.get(upstream.node) {
            visited.set(upstream.node);
            on_stack.set(upstream.node);
            stack.push(Frame {
                node: upstream.node,
                next_input: 0,
            });
        }
    }
    Ok(())
}

/// Drops every node not marked in `reachable`. The Output node always stays.
pub fn remove_unreachable(
    graph: &mut ShaderGraph,
    reachable: &NodeFlags,
) -> Result<usize, CompileError> {
    let dead: NodeSet = graph
        .nodes()
        .map(|n| n.id())
        .filter(|&id| id != NodeId::OUTPUT && !reachable.get(id))
        .collect();
    graph.remove_nodes(&dead)?;
    tracing::debug!(removed = dead.len(), "removed unreachable nodes");
    Ok(dead.len())
}
