//! Node expansion.

use shadergraph_core::{capability, ShaderGraph};

use crate::error::CompileError;

/// Expands every node once, including nodes appended by earlier expansions.
///
/// Walks the arena by position and re-reads its length every step; the
/// per-node `expanded` flag keeps appended nodes from expanding twice.
pub fn expand_nodes(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let mut index = 0;
    let mut expanded = 0usize;
    while let Some(node) = graph.node_at(index) {
        index += 1;
        if node.is_expanded() {
            continue;
        }
        let id = node.id();
        graph.set_expanded(id)?;
        capability::expand(graph, id)?;
        expanded += 1;
    }
    tracing::debug!(expanded, "expanded nodes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadergraph_core::{MathType, NodeId, NodeKind};

    #[test]
    fn clamped_math_gets_clamp_node() {
        let mut graph = ShaderGraph::new();
        let math = graph.add_node(NodeKind::Math {
            math_type: MathType::Add,
            use_clamp: true,
        });
        graph
            .connect_by_name(math, "Value", NodeId::OUTPUT, "Displacement")
            .unwrap();
        let before = graph.node_count();

        expand_nodes(&mut graph).unwrap();
        assert_eq!(graph.node_count(), before + 1);
        assert!(graph.nodes().all(|n| n.is_expanded()));

        // a second run finds nothing left to do
        expand_nodes(&mut graph).unwrap();
        assert_eq!(graph.node_count(), before + 1);
    }
}
