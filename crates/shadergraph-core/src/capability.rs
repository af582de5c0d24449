//! Per-kind node behaviour: constant folding, expansion and settings
//! simplification.
//!
//! Nodes live in the graph arena, so these capabilities take the graph and a
//! node id (or a [`ConstantFolder`] bound to one) rather than `&mut self`.

use crate::context::{AovKind, SceneContext};
use crate::error::CoreError;
use crate::fold::ConstantFolder;
use crate::graph::ShaderGraph;
use crate::id::{InputRef, NodeId};
use crate::kind::NodeKind;
use crate::math::{eval_clamp, eval_math, eval_mix, eval_vector_math, ClampType};
use crate::socket::{SocketType, SocketValue};

/// Runs the node's fold rule for the folder's output.
pub fn constant_fold(folder: &mut ConstantFolder<'_>) -> Result<(), CoreError> {
    let node = folder.node()?;
    let kind = node.kind.clone();
    let all_constant = !node.has_linked_inputs();

    match kind {
        NodeKind::Value => {
            let value = node.float("Value");
            folder.make_constant(SocketValue::Float(value))
        }
        NodeKind::Color => {
            let value = node.float3("Value");
            folder.make_constant(SocketValue::Float3(value))
        }
        NodeKind::Convert { from, to, .. } => fold_convert(folder, from, to, all_constant),
        NodeKind::Emission { .. } => {
            let dark = !node.is_linked("Color") && node.float3("Color") == [0.0; 3];
            let off = !node.is_linked("Strength") && node.float("Strength") == 0.0;
            if dark || off {
                folder.discard()?;
            }
            Ok(())
        }
        NodeKind::AddClosure => {
            if !node.is_linked("Closure1") {
                folder.bypass_or_discard("Closure2")
            } else if !node.is_linked("Closure2") {
                folder.bypass_or_discard("Closure1")
            } else {
                Ok(())
            }
        }
        NodeKind::MixClosure => {
            let link1 = node.input("Closure1").and_then(|i| i.link());
            let link2 = node.input("Closure2").and_then(|i| i.link());
            let fac_linked = node.is_linked("Fac");
            let fac = node.float("Fac");
            if link1 == link2 {
                folder.bypass_or_discard("Closure1")
            } else if !fac_linked && fac <= 0.0 {
                folder.bypass_or_discard("Closure1")
            } else if !fac_linked && fac >= 1.0 {
                folder.bypass_or_discard("Closure2")
            } else {
                Ok(())
            }
        }
        NodeKind::Math {
            math_type,
            use_clamp,
        } => {
            if all_constant {
                let value = eval_math(
                    math_type,
                    node.float("Value1"),
                    node.float("Value2"),
                    node.float("Value3"),
                );
                folder.make_constant_clamp(SocketValue::Float(value), use_clamp)
            } else {
                folder.fold_math(math_type)
            }
        }
        NodeKind::Clamp { clamp_type } => {
            if all_constant {
                let value = eval_clamp(
                    clamp_type,
                    node.float("Value"),
                    node.float("Min"),
                    node.float("Max"),
                );
                folder.make_constant(SocketValue::Float(value))
            } else {
                Ok(())
            }
        }
        NodeKind::VectorMath { math_type } => {
            if all_constant {
                let (value, vector) = eval_vector_math(
                    math_type,
                    node.float3("Vector1"),
                    node.float3("Vector2"),
                    node.float3("Vector3"),
                    node.float("Scale"),
                );
                if folder.output_name()? == "Value" {
                    folder.make_constant(SocketValue::Float(value))
                } else {
                    folder.make_constant(SocketValue::Float3(vector))
                }
            } else {
                folder.fold_vector_math(math_type)
            }
        }
        NodeKind::Mix {
            mix_type,
            use_clamp,
        } => {
            if all_constant {
                let color = eval_mix(
                    mix_type,
                    node.float("Fac"),
                    node.float3("Color1"),
                    node.float3("Color2"),
                );
                folder.make_constant_clamp(SocketValue::Float3(color), use_clamp)
            } else {
                folder.fold_mix(mix_type, use_clamp)
            }
        }
        NodeKind::Bump { .. } => {
            if node.is_linked("Height") {
                return Ok(());
            }
            match node.input("Normal").and_then(|i| i.link()) {
                Some(normal) => folder.bypass(normal),
                None => {
                    let geometry = folder.graph.add_node(NodeKind::Geometry);
                    let normal = folder.graph.output_ref(geometry, "Normal")?;
                    folder.bypass(normal)
                }
            }
        }
        NodeKind::Displacement { .. } => {
            let flat = node.float("Height") - node.float("Midlevel") == 0.0;
            let unscaled = node.float("Scale") == 0.0;
            if all_constant && (flat || unscaled) {
                folder.make_zero()?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn fold_convert(
    folder: &mut ConstantFolder<'_>,
    from: SocketType,
    to: SocketType,
    all_constant: bool,
) -> Result<(), CoreError> {
    let node = folder.node()?;

    if all_constant {
        let value = node.inputs()[0].value.clone();
        let scalar_from = matches!(from, SocketType::Float | SocketType::Int);
        let scalar_to = matches!(to, SocketType::Float | SocketType::Int);
        if (scalar_from && (to.is_float3() || scalar_to)) || (from.is_float3() && scalar_to) {
            let converted = value.convert(to, from == SocketType::Color);
            return folder.make_constant(converted);
        }
        if from.is_float3() && to.is_float3() {
            return folder.make_constant(value);
        }
        return Ok(());
    }

    // A -> B -> A round trips through float3 collapse to the original source.
    let Some(upstream) = node.inputs()[0].link() else {
        return Ok(());
    };
    let prev = folder.graph.node(upstream.node)?;
    let round_trip = matches!(
        prev.kind,
        NodeKind::Convert { from: pf, to: pt, .. } if pf == to && pt == from
    );
    if round_trip && from.is_float3() && (to == SocketType::Float || to.is_float3()) {
        if let Some(source) = prev.inputs()[0].link() {
            folder.bypass(source)?;
        }
    }
    Ok(())
}

/// Replaces high-level node features with explicit nodes.
///
/// Math nodes with `use_clamp` get a Clamp(0, 1) node spliced after them.
pub fn expand(graph: &mut ShaderGraph, id: NodeId) -> Result<(), CoreError> {
    let clamped = matches!(
        graph.node(id)?.kind,
        NodeKind::Math {
            use_clamp: true,
            ..
        }
    );
    if clamped {
        let result = graph.output_ref(id, "Value")?;
        if graph.links_of(result)?.is_empty() {
            return Ok(());
        }
        let clamp = graph.add_node(NodeKind::Clamp {
            clamp_type: ClampType::MinMax,
        });
        let clamp_node = graph.node_mut(clamp)?;
        clamp_node.set_input_value("Min", SocketValue::Float(0.0));
        clamp_node.set_input_value("Max", SocketValue::Float(1.0));

        let clamp_out = graph.output_ref(clamp, "Result")?;
        graph.relink_output(result, Some(clamp_out))?;
        let clamp_in = graph.input_ref(clamp, "Value")?;
        graph.connect(result, clamp_in)?;
    }
    Ok(())
}

/// Node-local normalization that depends on scene state.
///
/// AOV outputs keep only the input matching the registered pass type and
/// lose both when the pass is not registered.
pub fn simplify_settings(
    graph: &mut ShaderGraph,
    id: NodeId,
    ctx: &SceneContext,
) -> Result<(), CoreError> {
    let NodeKind::AovOutput { name } = &graph.node(id)?.kind else {
        return Ok(());
    };

    let registered = ctx.aov(name);
    let drop_value = registered != Some(AovKind::Value);
    let drop_color = registered != Some(AovKind::Color);

    for (input, drop) in [("Value", drop_value), ("Color", drop_color)] {
        let input: InputRef = graph.input_ref(id, input)?;
        if drop && graph.input(input)?.is_linked() {
            graph.disconnect_input(input)?;
        }
    }
    Ok(())
}
