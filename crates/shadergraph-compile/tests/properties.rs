//! Property-based tests for the cleaning pipeline.
//!
//! Random graphs of math nodes with arbitrary (often cyclic) links are
//! cleaned, then checked for acyclicity, reachability and hash stability.

use std::collections::BTreeSet;

use proptest::prelude::*;
use shadergraph_compile::{clean, compute_displacement_hash};
use shadergraph_core::topology;
use shadergraph_core::{MathType, NodeId, NodeKind, SceneContext, ShaderGraph, SocketValue};

const MATH_TYPES: [MathType; 4] = [
    MathType::Add,
    MathType::Multiply,
    MathType::Power,
    MathType::Sine,
];

/// Math nodes `0..n`, links as `(from, to, input slot)`, and the node that
/// feeds displacement.
fn build(
    literals: &[(usize, f32)],
    links: &[(usize, usize, usize)],
    root: usize,
) -> ShaderGraph {
    let mut graph = ShaderGraph::new();
    let ids: Vec<NodeId> = literals
        .iter()
        .map(|&(ty, value)| {
            let id = graph.add_node(NodeKind::Math {
                math_type: MATH_TYPES[ty % MATH_TYPES.len()],
                use_clamp: false,
            });
            graph
                .node_mut(id)
                .unwrap()
                .set_input_value("Value2", SocketValue::Float(value));
            id
        })
        .collect();

    for &(from, to, slot) in links {
        let from = ids[from % ids.len()];
        let to = ids[to % ids.len()];
        let input = ["Value1", "Value2"][slot % 2];
        graph.connect_by_name(from, "Value", to, input).unwrap();
    }
    graph
        .connect_by_name(ids[root % ids.len()], "Value", NodeId::OUTPUT, "Displacement")
        .unwrap();
    graph
}

fn reachable_from_output(graph: &ShaderGraph) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![NodeId::OUTPUT];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            let node = graph.node(id).unwrap();
            stack.extend(node.inputs().iter().filter_map(|i| i.link()).map(|o| o.node));
        }
    }
    seen
}

fn graph_strategy() -> impl Strategy<Value = (Vec<(usize, f32)>, Vec<(usize, usize, usize)>, usize)> {
    (
        prop::collection::vec((0usize..4, -4.0f32..4.0), 1..8),
        prop::collection::vec((0usize..8, 0usize..8, 0usize..2), 0..16),
        0usize..8,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// After cleaning, no link cycle survives and every node is needed by
    /// the output.
    #[test]
    fn clean_leaves_acyclic_reachable_graph((literals, links, root) in graph_strategy()) {
        let mut graph = build(&literals, &links, root);
        clean(&mut graph, &SceneContext::default()).unwrap();

        prop_assert!(topology::is_acyclic(&graph));
        let live = reachable_from_output(&graph);
        for node in graph.nodes() {
            prop_assert!(live.contains(&node.id()), "node {} is unreachable", node.id());
        }
    }

    /// Building the same graph twice yields the same displacement hash.
    #[test]
    fn displacement_hash_is_reproducible((literals, links, root) in graph_strategy()) {
        let a = build(&literals, &links, root);
        let b = build(&literals, &links, root);
        prop_assert_eq!(
            compute_displacement_hash(&a).unwrap(),
            compute_displacement_hash(&b).unwrap()
        );
    }
}
