//! Bump mapping by finite differences.
//!
//! A bump evaluates its height function three times: at the shading point
//! and at small offsets along the two surface derivatives. Both passes here
//! get there by cloning the height subgraph and tagging every copy with the
//! [`BumpState`] it is evaluated under.

use shadergraph_core::{
    BumpState, NodeId, NodeKind, NodeMap, NodeSet, OutputRef, ShaderGraph, SocketValue,
    SpecialType, VectorMathType,
};

use crate::error::CompileError;

fn tag(
    graph: &mut ShaderGraph,
    nodes: impl IntoIterator<Item = NodeId>,
    state: BumpState,
    filter_width: f32,
) -> Result<(), CompileError> {
    for id in nodes {
        let node = graph.node_mut(id)?;
        node.bump = state;
        node.bump_filter_width = filter_width;
    }
    Ok(())
}

/// The clone of `out` inside a copied subgraph.
fn mapped(map: &NodeMap, out: OutputRef) -> Result<OutputRef, CompileError> {
    let node = map.get(&out.node).copied().ok_or_else(|| {
        CompileError::InvalidGraph(format!("node {} missing from cloned subgraph", out.node))
    })?;
    Ok(OutputRef { node, ..out })
}

/// Turns every user bump node with a linked Height into an explicit
/// three-sample bump.
///
/// The existing height subgraph becomes the center sample; two clones
/// provide the dx and dy samples. Height itself is disconnected afterwards,
/// it only existed to carry the user's link.
pub fn refine_bump_nodes(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let mut refined = 0usize;

    for id in graph.node_ids() {
        let node = graph.node(id)?;
        if node.special_type() != SpecialType::Bump {
            continue;
        }
        let filter_width = node.float("Filter Width");
        let height = graph.input_ref(id, "Height")?;
        let Some(source) = graph.link_of(height)? else {
            continue;
        };

        let center = graph.find_dependencies(height)?;
        let dx = graph.clone_subgraph(&center)?;
        let dy = graph.clone_subgraph(&center)?;

        tag(graph, center.iter().copied(), BumpState::Center, filter_width)?;
        tag(graph, dx.values().copied(), BumpState::Dx, filter_width)?;
        tag(graph, dy.values().copied(), BumpState::Dy, filter_width)?;

        let sample_x = graph.input_ref(id, "SampleX")?;
        let sample_y = graph.input_ref(id, "SampleY")?;
        let sample_center = graph.input_ref(id, "SampleCenter")?;
        graph.connect(mapped(&dx, source)?, sample_x)?;
        graph.connect(mapped(&dy, source)?, sample_y)?;
        graph.connect(source, sample_center)?;
        graph.disconnect_input(height)?;
        refined += 1;
    }

    tracing::debug!(refined, "refined bump nodes");
    Ok(())
}

/// Converts the displacement subgraph into a bumped shading normal.
///
/// 1. Collect everything feeding Output.Displacement
/// 2. Clone it three times, for the center, dx and dy samples
/// 3. Project each sample onto the geometric normal with a dot product
/// 4. Feed the three heights into a Bump node and its result through a
///    SetNormal node into Output.Normal, replacing any previous link
pub fn bump_from_displacement(
    graph: &mut ShaderGraph,
    use_object_space: bool,
) -> Result<(), CompileError> {
    let displacement = graph.input_ref(NodeId::OUTPUT, "Displacement")?;
    let Some(source) = graph.link_of(displacement)? else {
        return Ok(());
    };

    let deps: NodeSet = graph.find_dependencies(displacement)?;
    let center = graph.clone_subgraph(&deps)?;
    let dx = graph.clone_subgraph(&deps)?;
    let dy = graph.clone_subgraph(&deps)?;

    let geometry = graph.add_node(NodeKind::Geometry);
    let dot = |graph: &mut ShaderGraph| {
        graph.add_node(NodeKind::VectorMath {
            math_type: VectorMathType::DotProduct,
        })
    };
    let dot_center = dot(graph);
    let dot_dx = dot(graph);
    let dot_dy = dot(graph);
    let bump = graph.add_node(NodeKind::Bump {
        invert: false,
        use_object_space,
    });
    let set_normal = graph.add_node(NodeKind::SetNormal);

    let bump_node = graph.node_mut(bump)?;
    bump_node.set_input_value("Distance", SocketValue::Float(1.0));
    let filter_width = bump_node.float("Filter Width");

    tag(graph, center.values().copied(), BumpState::Center, filter_width)?;
    tag(graph, dx.values().copied(), BumpState::Dx, filter_width)?;
    tag(graph, dy.values().copied(), BumpState::Dy, filter_width)?;

    let geometry_normal = graph.output_ref(geometry, "Normal")?;
    for node in [dot_center, dot_dx, dot_dy] {
        let vector2 = graph.input_ref(node, "Vector2")?;
        graph.connect(geometry_normal, vector2)?;
    }
    graph.connect_by_name(geometry, "Normal", bump, "Normal")?;

    let samples = [
        (&center, dot_center, "SampleCenter"),
        (&dx, dot_dx, "SampleX"),
        (&dy, dot_dy, "SampleY"),
    ];
    for (map, dot, sample) in samples {
        let vector1 = graph.input_ref(dot, "Vector1")?;
        graph.connect(mapped(map, source)?, vector1)?;
        graph.connect_by_name(dot, "Value", bump, sample)?;
    }

    graph.connect_by_name(bump, "Normal", set_normal, "Direction")?;

    let normal = graph.input_ref(NodeId::OUTPUT, "Normal")?;
    if graph.link_of(normal)?.is_some() {
        graph.disconnect_input(normal)?;
    }
    graph.connect_by_name(set_normal, "Normal", NodeId::OUTPUT, "Normal")?;

    tracing::debug!(cloned = deps.len() * 3, "built bump from displacement");
    Ok(())
}
