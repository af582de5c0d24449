//! JSON graph descriptions.
//!
//! A description names every node except the implicit `output`, sets
//! literal input values, and lists links as `"node.Socket"` pairs:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "name": "height", "node": { "type": "value" }, "values": { "Value": 2.0 } }
//!   ],
//!   "links": [{ "from": "height.Value", "to": "output.Displacement" }]
//! }
//! ```
//!
//! Socket names may contain spaces; node names may not contain dots.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use shadergraph_compile::CompileError;
use shadergraph_core::{CoreError, NodeId, NodeKind, SceneContext, ShaderGraph, SocketValue};

/// Name reserved for the graph's Output node.
pub const OUTPUT_NAME: &str = "output";

/// Errors loading or building a graph description.
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid graph description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{node}' has no input '{socket}'")]
    UnknownSocket { node: String, socket: String },

    #[error("malformed socket reference '{0}', expected 'node.Socket'")]
    BadReference(String),

    #[error("invalid AOV '{0}', expected NAME, NAME:color or NAME:value")]
    BadAov(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A literal as written in JSON; converted to the socket's type on assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Number(f32),
    Triple([f32; 3]),
    Text(String),
}

impl From<&Literal> for SocketValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Boolean(b) => SocketValue::Boolean(*b),
            Literal::Number(n) => SocketValue::Float(*n),
            Literal::Triple(v) => SocketValue::Float3(*v),
            Literal::Text(s) => SocketValue::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    pub node: NodeKind,
    #[serde(default)]
    pub values: IndexMap<String, Literal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDescription {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    /// Output node literals, e.g. a constant displacement.
    #[serde(default)]
    pub output: IndexMap<String, Literal>,
    #[serde(default)]
    pub scene: SceneContext,
}

impl GraphDescription {
    pub fn load(path: &Path) -> Result<Self, DescriptionError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the graph. Rejected links are not errors: they end up as
    /// diagnostics on the returned graph.
    pub fn build(&self) -> Result<ShaderGraph, DescriptionError> {
        let mut graph = ShaderGraph::new();
        let mut names: IndexMap<&str, NodeId> = IndexMap::new();
        names.insert(OUTPUT_NAME, NodeId::OUTPUT);

        for desc in &self.nodes {
            if names.contains_key(desc.name.as_str()) {
                return Err(DescriptionError::DuplicateNode(desc.name.clone()));
            }
            let id = graph.add_node(desc.node.clone());
            set_values(&mut graph, id, &desc.name, &desc.values)?;
            names.insert(&desc.name, id);
        }
        set_values(&mut graph, NodeId::OUTPUT, OUTPUT_NAME, &self.output)?;

        for link in &self.links {
            let (from_node, output) = resolve(&names, &link.from)?;
            let (to_node, input) = resolve(&names, &link.to)?;
            graph.connect_by_name(from_node, output, to_node, input)?;
        }

        tracing::debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            "built graph from description"
        );
        Ok(graph)
    }
}

fn set_values(
    graph: &mut ShaderGraph,
    id: NodeId,
    name: &str,
    values: &IndexMap<String, Literal>,
) -> Result<(), DescriptionError> {
    let node = graph.node_mut(id)?;
    for (socket, literal) in values {
        if !node.set_input_value(socket, literal.into()) {
            return Err(DescriptionError::UnknownSocket {
                node: name.to_string(),
                socket: socket.clone(),
            });
        }
    }
    Ok(())
}

fn resolve<'a>(
    names: &IndexMap<&str, NodeId>,
    reference: &'a str,
) -> Result<(NodeId, &'a str), DescriptionError> {
    let (node, socket) = reference
        .split_once('.')
        .ok_or_else(|| DescriptionError::BadReference(reference.to_string()))?;
    let id = names
        .get(node)
        .copied()
        .ok_or_else(|| DescriptionError::UnknownNode(node.to_string()))?;
    Ok((id, socket))
}
