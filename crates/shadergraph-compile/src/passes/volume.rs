//! Volume output verification.

use std::collections::HashSet;

use shadergraph_core::{GraphDiagnostic, NodeId, ShaderGraph};

use crate::error::CompileError;

/// Walks the volume subgraph, tagging nodes that cannot be sampled
/// stochastically and dropping the volume output when nothing in it can
/// produce a volume closure.
///
/// The walk carries a `linear` tag that starts true and stays true only
/// through linear operations. Nodes reached with the tag false get
/// `stochastic_sample` cleared. Each `(node, tag)` pair is visited once.
pub fn verify_volume_output(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let volume_in = graph.input_ref(NodeId::OUTPUT, "Volume")?;
    let Some(root) = graph.link_of(volume_in)? else {
        return Ok(());
    };

    let mut has_valid_volume = false;
    let mut visited: HashSet<(NodeId, bool)> = HashSet::new();
    let mut stack = vec![(root.node, true)];

    while let Some((id, linear)) = stack.pop() {
        if !visited.insert((id, linear)) {
            continue;
        }

        let node = graph.node_mut(id)?;
        if !linear {
            node.stochastic_sample = false;
        }
        has_valid_volume |= node.has_volume_support();

        let upstream_linear = linear && node.is_linear_operation();
        stack.extend(
            node.inputs()
                .iter()
                .filter_map(|input| input.link())
                .map(|from| (from.node, upstream_linear)),
        );
    }

    if !has_valid_volume {
        graph.disconnect_input(volume_in)?;
        graph.report(GraphDiagnostic::VolumeDisconnected);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadergraph_core::{MathType, NodeKind};

    #[test]
    fn volume_without_volume_closure_is_disconnected() {
        let mut graph = ShaderGraph::new();
        let diffuse = graph.add_node(NodeKind::DiffuseBsdf);
        graph
            .connect_by_name(diffuse, "BSDF", NodeId::OUTPUT, "Volume")
            .unwrap();

        verify_volume_output(&mut graph).unwrap();

        assert!(!graph.output().is_linked("Volume"));
        assert_eq!(
            graph.diagnostics().last(),
            Some(&GraphDiagnostic::VolumeDisconnected)
        );
    }

    #[test]
    fn nonlinear_inputs_lose_stochastic_sampling() {
        let mut graph = ShaderGraph::new();
        let scatter = graph.add_node(NodeKind::ScatterVolume);
        let power = graph.add_node(NodeKind::Math {
            math_type: MathType::Power,
            use_clamp: false,
        });
        let attr = graph.add_node(NodeKind::Attribute {
            name: "density".into(),
        });
        let direct = graph.add_node(NodeKind::Attribute {
            name: "tint".into(),
        });
        graph.connect_by_name(attr, "Fac", power, "Value1").unwrap();
        graph.connect_by_name(power, "Value", scatter, "Density").unwrap();
        graph.connect_by_name(direct, "Color", scatter, "Color").unwrap();
        graph
            .connect_by_name(scatter, "Volume", NodeId::OUTPUT, "Volume")
            .unwrap();

        verify_volume_output(&mut graph).unwrap();

        assert!(graph.output().is_linked("Volume"));
        assert!(graph.node(power).unwrap().stochastic_sample);
        assert!(graph.node(direct).unwrap().stochastic_sample);
        assert!(!graph.node(attr).unwrap().stochastic_sample);
    }
}
