//! Bottom-up common subexpression elimination.

use std::collections::HashMap;

use shadergraph_core::{NodeId, OutputRef, ShaderGraph};

use super::Worklist;
use crate::error::CompileError;

/// Merges structurally equal nodes. Returns the number of nodes merged.
///
/// Producers are visited before consumers, so by the time a node is compared
/// its upstream duplicates have already been folded onto one canonical node
/// and link identity is enough to compare linked inputs.
pub fn deduplicate_nodes(graph: &mut ShaderGraph) -> Result<usize, CompileError> {
    let mut candidates: HashMap<String, Vec<NodeId>> = HashMap::new();
    let mut merged = 0;

    let mut worklist = Worklist::seed(graph);
    while let Some(id) = worklist.pop() {
        let node = graph.node(id)?;
        if !node.has_output_links() {
            continue;
        }
        let type_name = node.type_name();

        let mut canonical = None;
        for &other in candidates.get(&type_name).into_iter().flatten() {
            if nodes_equal(graph, id, other)? {
                canonical = Some(other);
                break;
            }
        }

        worklist.schedule_consumers(graph, id)?;

        match canonical {
            Some(other) => {
                let num_outputs = graph.node(id)?.outputs().len();
                for slot in 0..num_outputs {
                    graph.bypass(
                        id,
                        OutputRef::new(id, slot),
                        Some(OutputRef::new(other, slot)),
                    )?;
                }
                merged += 1;
            }
            None => candidates.entry(type_name).or_default().push(id),
        }
    }

    tracing::debug!(merged, "deduplicated nodes");
    Ok(merged)
}

/// Node-local equality plus identical upstream for every linked input.
fn nodes_equal(graph: &ShaderGraph, a: NodeId, b: NodeId) -> Result<bool, CompileError> {
    let (a, b) = (graph.node(a)?, graph.node(b)?);
    if !a.equals(b) {
        return Ok(false);
    }
    Ok(a
        .inputs()
        .iter()
        .zip(b.inputs())
        .all(|(x, y)| x.link() == y.link()))
}
