//! Deterministic content hash of the displacement subgraph.
//!
//! Shaders whose displacement hashes match can share displaced geometry,
//! so the hash covers exactly what influences displacement: every node
//! feeding Output.Displacement, its settings and literals, and how those
//! nodes are wired together.
//!
//! # Determinism
//!
//! - Nodes are visited in id order (`NodeSet` is a `BTreeSet`)
//! - Node settings are hashed through `serde_json::to_vec`, and no node
//!   kind contains a `HashMap`
//! - Floats are hashed by their bit patterns

use shadergraph_core::{NodeId, NodeKind, ShaderGraph, ShaderNode};

use crate::error::CompileError;

/// Content hash of a single node, links excluded.
pub fn hash_node_content(node: &ShaderNode) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    node.hash(&mut hasher);
    hasher.finalize()
}

/// Hex digest of the displacement subgraph, or an empty string when
/// Output.Displacement is unlinked.
///
/// Per node: its content hash, then per input the upstream node id (zero
/// when unlinked), the input name and the upstream output name (empty when
/// unlinked). OSL nodes add their bytecode hash.
pub fn compute_displacement_hash(graph: &ShaderGraph) -> Result<String, CompileError> {
    let displacement = graph.input_ref(NodeId::OUTPUT, "Displacement")?;
    if graph.link_of(displacement)?.is_none() {
        return Ok(String::new());
    }

    let mut hasher = blake3::Hasher::new();
    for id in graph.find_dependencies(displacement)? {
        let node = graph.node(id)?;
        hasher.update(hash_node_content(node).as_bytes());

        if let NodeKind::Osl(osl) = &node.kind {
            hasher.update(osl.bytecode_hash.as_bytes());
        }

        for input in node.inputs() {
            let (upstream, output_name) = match input.link() {
                Some(from) => (from.node.0, graph.output_socket(from)?.name.as_str()),
                None => (0, ""),
            };
            hasher.update(&upstream.to_le_bytes());
            hasher.update(input.name.as_bytes());
            hasher.update(output_name.as_bytes());
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}
