//! Constant folding over a topological worklist.

use shadergraph_core::{
    capability, ConstantFolder, NodeId, NodeKind, OutputRef, ShaderGraph, SocketValue,
};

use super::Worklist;
use crate::error::CompileError;

/// Folds every reachable node in producer-before-consumer order.
///
/// 1. Seed the worklist with nodes that have no linked input
/// 2. Pop a node, schedule consumers whose producers are all done
/// 3. Fold each of its outputs that still has consumers
/// 4. If displacement was linked and folding removed the link, feed the
///    displacement literal back in through a Color node
pub fn constant_fold(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let has_displacement = graph.output().is_linked("Displacement");
    let links_before = graph.link_count();

    let mut worklist = Worklist::seed(graph);
    while let Some(id) = worklist.pop() {
        worklist.schedule_consumers(graph, id)?;

        let num_outputs = graph.node(id)?.outputs().len();
        for slot in 0..num_outputs {
            let output = OutputRef::new(id, slot);
            if graph.links_of(output)?.is_empty() {
                continue;
            }
            let mut folder = ConstantFolder::new(graph, output);
            capability::constant_fold(&mut folder)?;
        }
    }

    if has_displacement && !graph.output().is_linked("Displacement") {
        let literal = graph.output().float3("Displacement");
        let color = graph.add_node(NodeKind::Color);
        graph
            .node_mut(color)?
            .set_input_value("Value", SocketValue::Float3(literal));
        graph.connect_by_name(color, "Color", NodeId::OUTPUT, "Displacement")?;
    }

    tracing::debug!(
        links_before,
        links_after = graph.link_count(),
        "constant folding complete"
    );
    Ok(())
}
