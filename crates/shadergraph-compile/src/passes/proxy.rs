//! Proxy conversion removal.
//!
//! Proxies are same-type conversions left behind by graph construction
//! (group sockets, reroutes). They are bypassed when fed, otherwise their
//! literal is pushed into every consumer.

use shadergraph_core::{InputRef, NodeId, NodeSet, OutputRef, ShaderGraph, SpecialType};

use crate::error::CompileError;

pub fn remove_proxy_nodes(graph: &mut ShaderGraph) -> Result<(), CompileError> {
    let mut removed = NodeSet::new();

    for id in graph.node_ids() {
        if graph.node(id)?.special_type() != SpecialType::Proxy {
            continue;
        }

        let input = InputRef::new(id, 0);
        let output = OutputRef::new(id, 0);

        if let Some(upstream) = graph.link_of(input)? {
            graph.bypass(id, output, Some(upstream))?;
        } else {
            let value = graph.input(input)?.value.clone();
            for consumer in graph.links_of(output)?.to_vec() {
                if graph.node(consumer.node)?.special_type() == SpecialType::AutoConvert
                    && drop_default_links(graph, consumer.node)?
                {
                    removed.insert(consumer.node);
                }
                graph.disconnect_input(consumer)?;
                graph.set_value(consumer, &value)?;
            }
        }

        removed.insert(id);
    }

    tracing::debug!(removed = removed.len(), "removed proxy nodes");
    graph.remove_nodes(&removed)?;
    Ok(())
}

/// Disconnects every consumer of an auto-convert node that would receive a
/// default link anyway. Returns true when nothing else consumes it.
fn drop_default_links(
    graph: &mut ShaderGraph,
    convert: NodeId,
) -> Result<bool, CompileError> {
    let output = OutputRef::new(convert, 0);
    let mut all_removed = true;
    for consumer in graph.links_of(output)?.to_vec() {
        if graph.input(consumer)?.flags.default_link.is_some() {
            graph.disconnect_input(consumer)?;
        } else {
            all_removed = false;
        }
    }
    Ok(all_removed)
}
