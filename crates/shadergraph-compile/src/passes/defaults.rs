//! Default input wiring.
//!
//! Unlinked inputs tagged with a [`DefaultLink`] read an implicit geometry
//! or texture coordinate value. This pass makes that explicit by linking
//! them to one shared Geometry and one shared TextureCoordinate node,
//! created on first use.

use shadergraph_core::{DefaultLink, InputRef, NodeId, NodeKind, ShaderGraph};

use crate::error::CompileError;

#[derive(Default)]
struct SharedSources {
    geometry: Option<NodeId>,
    texture_coordinate: Option<NodeId>,
}

impl SharedSources {
    fn geometry(&mut self, graph: &mut ShaderGraph) -> NodeId {
        *self
            .geometry
            .get_or_insert_with(|| graph.add_node(NodeKind::Geometry))
    }

    fn texture_coordinate(&mut self, graph: &mut ShaderGraph) -> NodeId {
        *self
            .texture_coordinate
            .get_or_insert_with(|| graph.add_node(NodeKind::TextureCoordinate))
    }
}

pub fn default_inputs(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let mut sources = SharedSources::default();
    let mut wired = 0usize;

    for id in graph.node_ids() {
        let pending: Vec<(usize, DefaultLink)> = graph
            .node(id)?
            .inputs()
            .iter()
            .enumerate()
            .filter(|(_, input)| !input.is_linked())
            .filter_map(|(slot, input)| input.flags.default_link.map(|link| (slot, link)))
            .collect();

        for (slot, link) in pending {
            let (source, output) = match link {
                DefaultLink::TextureGenerated => (sources.texture_coordinate(graph), "Generated"),
                DefaultLink::TextureNormal => (sources.texture_coordinate(graph), "Normal"),
                DefaultLink::TextureUv => (sources.texture_coordinate(graph), "UV"),
                DefaultLink::Incoming => (sources.geometry(graph), "Incoming"),
                DefaultLink::Normal => (sources.geometry(graph), "Normal"),
                DefaultLink::Position => (sources.geometry(graph), "Position"),
                DefaultLink::Tangent => (sources.geometry(graph), "Tangent"),
            };
            let from = graph.output_ref(source, output)?;
            graph.connect(from, InputRef::new(id, slot))?;
            wired += 1;
        }
    }

    tracing::debug!(wired, "linked default inputs");
    Ok(())
}
