//! Closure weight flattening.
//!
//! Mix and add closure nodes do not exist at render time: every leaf closure
//! carries its own mix weight instead. This pass pushes the weights of a
//! closure tree down into its leaves and reports the closure slot count.

use shadergraph_core::{
    InputRef, MathType, NodeId, NodeKind, OutputRef, ShaderGraph, SocketValue, SpecialType,
};

use crate::error::CompileError;

/// Distributes mix factors down a closure tree rooted at `node`.
///
/// `weight_out` is the output carrying the weight accumulated so far, or
/// `None` at the root. `volume` selects VolumeMixWeight over
/// SurfaceMixWeight on the leaves.
pub fn transform_multi_closure(
    graph: &mut ShaderGraph,
    node: NodeId,
    weight_out: Option<OutputRef>,
    volume: bool,
) -> Result<(), CompileError> {
    if graph.node(node)?.special_type() == SpecialType::CombineClosure {
        split_combine(graph, node, weight_out, volume)
    } else {
        apply_leaf_weight(graph, node, weight_out, volume)
    }
}

fn split_combine(
    graph: &mut ShaderGraph,
    node: NodeId,
    weight_out: Option<OutputRef>,
    volume: bool,
) -> Result<(), CompileError> {
    let closure1 = graph.link_of(graph.input_ref(node, "Closure1")?)?;
    let closure2 = graph.link_of(graph.input_ref(node, "Closure2")?)?;

    let Some(fac_slot) = graph.node(node)?.input_index("Fac") else {
        // add closure: both branches share the incoming weight
        for branch in [closure1, closure2].into_iter().flatten() {
            transform_multi_closure(graph, branch.node, weight_out, volume)?;
        }
        return Ok(());
    };

    let mix_weight = graph.add_node(NodeKind::MixClosureWeight);
    let fac_in = InputRef::new(node, fac_slot);
    let weight_fac = graph.input_ref(mix_weight, "Fac")?;
    match graph.link_of(fac_in)? {
        Some(fac_link) => {
            graph.connect(fac_link, weight_fac)?;
        }
        None => {
            let fac = graph.input(fac_in)?.value.clone();
            graph.set_value(weight_fac, &fac)?;
        }
    }

    if let Some(weight) = weight_out {
        let weight_in = graph.input_ref(mix_weight, "Weight")?;
        graph.connect(weight, weight_in)?;
    }

    let weight1 = graph.output_ref(mix_weight, "Weight1")?;
    let weight2 = graph.output_ref(mix_weight, "Weight2")?;
    if let Some(branch) = closure1 {
        transform_multi_closure(graph, branch.node, Some(weight1), volume)?;
    }
    if let Some(branch) = closure2 {
        transform_multi_closure(graph, branch.node, Some(weight2), volume)?;
    }
    Ok(())
}

fn apply_leaf_weight(
    graph: &mut ShaderGraph,
    node: NodeId,
    mut weight_out: Option<OutputRef>,
    volume: bool,
) -> Result<(), CompileError> {
    let Some(slot) = graph.node(node)?.mix_weight_input(volume) else {
        return Ok(());
    };
    let weight_in = InputRef::new(node, slot);
    let existing = graph.link_of(weight_in)?;
    let weight_value = graph.input(weight_in)?.value.as_float().unwrap_or(0.0);

    // a weight is already present: accumulate instead of overwriting
    if existing.is_some() || weight_value != 0.0 {
        let add = graph.add_node(NodeKind::Math {
            math_type: MathType::Add,
            use_clamp: false,
        });
        let value1 = graph.input_ref(add, "Value1")?;
        let value2 = graph.input_ref(add, "Value2")?;

        match existing {
            Some(link) => {
                graph.connect(link, value1)?;
            }
            None => graph.set_value(value1, &SocketValue::Float(weight_value))?,
        }
        match weight_out {
            Some(weight) => {
                graph.connect(weight, value2)?;
            }
            None => graph.set_value(value2, &SocketValue::Float(1.0))?,
        }

        weight_out = Some(graph.output_ref(add, "Value")?);
        if existing.is_some() {
            graph.disconnect_input(weight_in)?;
        }
    }

    match weight_out {
        Some(weight) => {
            graph.connect(weight, weight_in)?;
        }
        None => graph.set_value(weight_in, &SocketValue::Float(weight_value + 1.0))?,
    }
    Ok(())
}

/// Closure evaluation slots the graph needs at render time.
pub fn num_closures(graph: &ShaderGraph) -> u32 {
    graph
        .nodes()
        .filter_map(|node| node.closure_kind())
        .map(|kind| kind.slot_cost())
        .sum()
}
