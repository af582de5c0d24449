//! Human-readable and Graphviz renderings of a shader graph.

use petgraph::dot::Dot;
use shadergraph_core::topology::LinkGraph;
use shadergraph_core::ShaderGraph;

use crate::error::CompileError;

/// One line per node (`type #id`), then one `from -> to` line per link.
///
/// Links are listed by consumer, in node insertion order and input order.
pub fn dump_graph(graph: &ShaderGraph) -> Result<String, CompileError> {
    let mut lines: Vec<String> = graph
        .nodes()
        .map(|node| format!("{} #{}", node.type_name(), node.id()))
        .collect();

    for node in graph.nodes() {
        for input in node.inputs() {
            let Some(from) = input.link() else { continue };
            let output = graph.output_socket(from)?;
            lines.push(format!(
                "{}.{} -> {}.{}",
                from.node,
                output.name,
                node.id(),
                input.name
            ));
        }
    }

    Ok(lines.join("\n"))
}

/// Graphviz source for the graph, built on the petgraph link view.
pub fn to_dot(graph: &ShaderGraph) -> Result<String, CompileError> {
    let view = LinkGraph::build(graph);
    let mut labeled = view.graph.map(|_, &id| id.to_string(), |_, _| String::new());

    for index in labeled.node_indices() {
        let id = view.graph[index];
        labeled[index] = format!("{} #{}", graph.node(id)?.type_name(), id);
    }
    for index in labeled.edge_indices() {
        let edge = view.graph[index];
        let from = &graph.output_socket(edge.from)?.name;
        let to = &graph.input(edge.to)?.name;
        labeled[index] = format!("{from} -> {to}");
    }

    Ok(format!("{}", Dot::new(&labeled)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadergraph_core::{NodeId, NodeKind};

    fn sample() -> ShaderGraph {
        let mut graph = ShaderGraph::new();
        let value = graph.add_node(NodeKind::Value);
        graph
            .connect_by_name(value, "Value", NodeId::OUTPUT, "Displacement")
            .unwrap();
        graph
    }

    #[test]
    fn dump_lists_nodes_then_links() {
        let dump = dump_graph(&sample()).unwrap();
        insta::assert_snapshot!(dump, @r"
        output #0
        value #1
        convert_float_to_vector #2
        2.value_vector -> 0.Displacement
        1.Value -> 2.value_float
        ");
    }

    #[test]
    fn dot_output_has_every_node_and_link() {
        let dot = to_dot(&sample()).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("value #1"));
        assert!(dot.contains("convert_float_to_vector #2"));
        assert!(dot.contains("value_vector -> Displacement"));
        assert_eq!(dot.matches("->").count(), 2 + 2);
    }
}
