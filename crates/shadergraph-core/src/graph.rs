//! ShaderGraph: the node arena and its link primitives.
//!
//! [`ShaderGraph`] owns every node in an insertion-ordered arena keyed by
//! [`NodeId`]. Links are plain `(node, slot)` references stored on both ends
//! (the input's `link` and the output's fan-out list); every primitive here
//! updates both ends together.
//!
//! # Invariants
//!
//! - An input links to output `X` iff `X`'s fan-out contains that input.
//!   Debug builds check this after every link mutation.
//! - Node 0 is the Output node and is never removed.
//! - Ids come from a running counter and are never reused, so passes may
//!   size per-node flag arrays with [`ShaderGraph::id_bound`].
//!
//! # Lifecycle
//!
//! A graph starts unsimplified. Authoring mutations clear the simplified
//! flag; the pipeline sets it and, later, the one-way finalized flag. Adding
//! a node to a finalized graph is a contract violation and panics.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::diagnostics::GraphDiagnostic;
use crate::error::CoreError;
use crate::id::{InputRef, NodeId, OutputRef};
use crate::kind::NodeKind;
use crate::node::ShaderNode;
use crate::socket::{ShaderInput, ShaderOutput, SocketType, SocketValue};

/// Node ids iterated in id order.
pub type NodeSet = BTreeSet<NodeId>;

/// Original id to clone id, as returned by [`ShaderGraph::clone_subgraph`].
pub type NodeMap = BTreeMap<NodeId, NodeId>;

/// Outcome of [`ShaderGraph::connect`].
#[derive(Debug, Clone, PartialEq)]
pub enum Connection {
    /// The two sockets were linked directly.
    Linked,
    /// A conversion node (or an Emission node, for closure targets) was
    /// spliced between the two sockets.
    Converted { node: NodeId },
    /// Nothing changed; the diagnostic explains why.
    Rejected(GraphDiagnostic),
}

/// The shading graph.
#[derive(Debug, Clone)]
pub struct ShaderGraph {
    nodes: IndexMap<NodeId, ShaderNode>,
    next_node_id: u32,
    simplified: bool,
    finalized: bool,
    diagnostics: Vec<GraphDiagnostic>,
}

impl Default for ShaderGraph {
    fn default() -> Self {
        ShaderGraph::new()
    }
}

impl ShaderGraph {
    /// Creates a graph holding only the Output node (id 0).
    pub fn new() -> Self {
        let mut graph = ShaderGraph {
            nodes: IndexMap::new(),
            next_node_id: 0,
            simplified: false,
            finalized: false,
            diagnostics: Vec::new(),
        };
        graph.add_node(NodeKind::Output);
        graph
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// The Output node.
    pub fn output(&self) -> &ShaderNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Result<&ShaderNode, CoreError> {
        self.nodes.get(&id).ok_or(CoreError::NodeNotFound { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut ShaderNode, CoreError> {
        self.nodes.get_mut(&id).ok_or(CoreError::NodeNotFound { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ShaderNode> {
        self.nodes.values()
    }

    /// Snapshot of node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Node at an insertion-order position. Used by passes that append
    /// nodes while walking the arena.
    pub fn node_at(&self, index: usize) -> Option<&ShaderNode> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Upper bound (exclusive) of every id handed out so far.
    pub fn id_bound(&self) -> usize {
        self.next_node_id as usize
    }

    /// Total number of links in the graph.
    pub fn link_count(&self) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.inputs.iter())
            .filter(|i| i.is_linked())
            .count()
    }

    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn mark_simplified(&mut self) {
        self.simplified = true;
    }

    pub fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    /// Every diagnostic reported on this graph, oldest first.
    pub fn diagnostics(&self) -> &[GraphDiagnostic] {
        &self.diagnostics
    }

    /// Records and logs a recoverable problem.
    pub fn report(&mut self, diagnostic: GraphDiagnostic) {
        tracing::warn!(%diagnostic, "shader graph diagnostic");
        self.diagnostics.push(diagnostic);
    }

    // -----------------------------------------------------------------------
    // Socket lookup
    // -----------------------------------------------------------------------

    pub fn input_ref(&self, node: NodeId, name: &str) -> Result<InputRef, CoreError> {
        let slot = self
            .node(node)?
            .input_index(name)
            .ok_or_else(|| CoreError::UnknownInput {
                node,
                name: name.to_string(),
            })?;
        Ok(InputRef::new(node, slot))
    }

    pub fn output_ref(&self, node: NodeId, name: &str) -> Result<OutputRef, CoreError> {
        let slot = self
            .node(node)?
            .output_index(name)
            .ok_or_else(|| CoreError::UnknownOutput {
                node,
                name: name.to_string(),
            })?;
        Ok(OutputRef::new(node, slot))
    }

    pub fn input(&self, r: InputRef) -> Result<&ShaderInput, CoreError> {
        self.node(r.node)?
            .inputs
            .get(r.slot())
            .ok_or(CoreError::SocketOutOfRange {
                node: r.node,
                slot: r.slot(),
            })
    }

    pub fn output_socket(&self, r: OutputRef) -> Result<&ShaderOutput, CoreError> {
        self.node(r.node)?
            .outputs
            .get(r.slot())
            .ok_or(CoreError::SocketOutOfRange {
                node: r.node,
                slot: r.slot(),
            })
    }

    fn input_mut(&mut self, r: InputRef) -> Result<&mut ShaderInput, CoreError> {
        self.node_mut(r.node)?
            .inputs
            .get_mut(r.slot())
            .ok_or(CoreError::SocketOutOfRange {
                node: r.node,
                slot: r.slot(),
            })
    }

    fn output_mut(&mut self, r: OutputRef) -> Result<&mut ShaderOutput, CoreError> {
        self.node_mut(r.node)?
            .outputs
            .get_mut(r.slot())
            .ok_or(CoreError::SocketOutOfRange {
                node: r.node,
                slot: r.slot(),
            })
    }

    /// The upstream output of `input`, if linked.
    pub fn link_of(&self, input: InputRef) -> Result<Option<OutputRef>, CoreError> {
        Ok(self.input(input)?.link)
    }

    /// The inputs fed by `output`.
    pub fn links_of(&self, output: OutputRef) -> Result<&[InputRef], CoreError> {
        Ok(self.output_socket(output)?.links())
    }

    /// Sets a literal on an input socket, converting to the socket type.
    pub fn set_value(&mut self, input: InputRef, value: &SocketValue) -> Result<(), CoreError> {
        self.assert_mutable();
        self.input_mut(input)?.set_value(value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Node insertion and removal
    // -----------------------------------------------------------------------

    /// Adds a fresh node of `kind` and returns its id.
    ///
    /// # Panics
    ///
    /// If the graph has been finalized.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.add(ShaderNode::new(kind))
    }

    /// Adds an unattached node (for example a clone) and returns its id.
    ///
    /// Any links the node carries are dropped.
    ///
    /// # Panics
    ///
    /// If the graph has been finalized.
    pub fn add(&mut self, mut node: ShaderNode) -> NodeId {
        self.assert_mutable();

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        node.id = id;
        for input in &mut node.inputs {
            input.link = None;
        }
        for output in &mut node.outputs {
            output.links.clear();
        }

        self.nodes.insert(id, node);
        self.simplified = false;
        id
    }

    /// Marks a node as expanded so the expand pass visits it at most once.
    pub fn set_expanded(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.node_mut(id)?.expanded = true;
        Ok(())
    }

    /// Unlinks and drops every node in `remove`. The Output node is kept.
    ///
    /// Surviving nodes keep their ids and relative order.
    pub fn remove_nodes(&mut self, remove: &NodeSet) -> Result<(), CoreError> {
        self.assert_mutable();
        for &id in remove {
            if id == NodeId::OUTPUT || !self.contains(id) {
                continue;
            }
            self.disconnect_node_inputs(id)?;
            for slot in 0..self.node(id)?.outputs.len() {
                self.disconnect_output(OutputRef::new(id, slot))?;
            }
        }

        self.nodes
            .retain(|id, _| *id == NodeId::OUTPUT || !remove.contains(id));

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Link primitives
    // -----------------------------------------------------------------------

    /// Links `from` to `to`.
    ///
    /// Mismatched socket types are bridged automatically: a closure target
    /// gets an Emission node in between, any other target gets an
    /// auto-conversion node. Linking an already linked input, a literal-only
    /// input, or a closure output to a non-closure input is rejected with a
    /// diagnostic and leaves the graph untouched.
    pub fn connect(&mut self, from: OutputRef, to: InputRef) -> Result<Connection, CoreError> {
        self.assert_mutable();
        let (from_ty, from_name) = {
            let out = self.output_socket(from)?;
            (out.ty, out.name.clone())
        };
        let (to_ty, to_name, to_linked, to_linkable) = {
            let input = self.input(to)?;
            (
                input.ty,
                input.name.clone(),
                input.is_linked(),
                input.flags.linkable,
            )
        };

        if to_linked {
            let diagnostic = GraphDiagnostic::InputAlreadyLinked {
                node: to.node,
                input: to_name,
            };
            self.report(diagnostic.clone());
            return Ok(Connection::Rejected(diagnostic));
        }

        if !to_linkable {
            let diagnostic = GraphDiagnostic::NotLinkable {
                node: to.node,
                input: to_name,
            };
            self.report(diagnostic.clone());
            return Ok(Connection::Rejected(diagnostic));
        }

        if !from_ty.links_directly_to(to_ty) {
            if from_ty == SocketType::Closure {
                let diagnostic = GraphDiagnostic::ClosureConversion {
                    from: from.node,
                    output: from_name,
                    to: to.node,
                    input: to_name,
                    to_type: to_ty,
                };
                self.report(diagnostic.clone());
                return Ok(Connection::Rejected(diagnostic));
            }

            let bridge = if to_ty == SocketType::Closure {
                let emission = self.add_node(NodeKind::Emission {
                    from_auto_conversion: true,
                });
                let node = self.node_mut(emission)?;
                node.set_input_value("Color", SocketValue::Float3([1.0; 3]));
                node.set_input_value("Strength", SocketValue::Float(1.0));

                let target = if from_ty == SocketType::Float {
                    "Strength"
                } else {
                    "Color"
                };
                let target = self.input_ref(emission, target)?;
                self.connect(from, target)?;
                let source = self.output_ref(emission, "Emission")?;
                self.connect(source, to)?;
                emission
            } else {
                let convert = self.add_node(NodeKind::Convert {
                    from: from_ty,
                    to: to_ty,
                    autoconvert: true,
                });
                self.connect(from, InputRef::new(convert, 0))?;
                self.connect(OutputRef::new(convert, 0), to)?;
                convert
            };

            return Ok(Connection::Converted { node: bridge });
        }

        self.input_mut(to)?.link = Some(from);
        self.output_mut(from)?.links.push(to);
        self.simplified = false;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(Connection::Linked)
    }

    /// Convenience wrapper resolving both sockets by name.
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        output: &str,
        to_node: NodeId,
        input: &str,
    ) -> Result<Connection, CoreError> {
        let from = self.output_ref(from_node, output)?;
        let to = self.input_ref(to_node, input)?;
        self.connect(from, to)
    }

    /// Unlinks every input fed by `output`.
    pub fn disconnect_output(&mut self, output: OutputRef) -> Result<(), CoreError> {
        self.assert_mutable();
        let links = std::mem::take(&mut self.output_mut(output)?.links);
        for input in links {
            self.input_mut(input)?.link = None;
        }
        self.simplified = false;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Unlinks `input` from its upstream output.
    ///
    /// Errors with [`CoreError::InputNotLinked`] when there is no link.
    pub fn disconnect_input(&mut self, input: InputRef) -> Result<(), CoreError> {
        self.assert_mutable();
        let socket = self.input_mut(input)?;
        let Some(from) = socket.link.take() else {
            return Err(CoreError::InputNotLinked {
                node: input.node,
                input: socket.name.clone(),
            });
        };
        self.output_mut(from)?.links.retain(|l| *l != input);
        self.simplified = false;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Unlinks every linked input of `node`.
    pub fn disconnect_node_inputs(&mut self, node: NodeId) -> Result<(), CoreError> {
        self.assert_mutable();
        for slot in 0..self.node(node)?.inputs.len() {
            let input = InputRef::new(node, slot);
            if self.input(input)?.is_linked() {
                self.disconnect_input(input)?;
            }
        }
        Ok(())
    }

    /// Moves `from`'s upstream link to `to` and copies `from`'s literal onto
    /// `to`.
    pub fn relink_input(&mut self, from: InputRef, to: InputRef) -> Result<(), CoreError> {
        self.assert_mutable();
        let upstream = self.link_of(from)?;
        let value = self.input(from)?.value.clone();

        if let Some(upstream) = upstream {
            self.disconnect_input(from)?;
            self.connect(upstream, to)?;
        }

        self.set_value(to, &value)
    }

    /// Redirects every consumer of `from` to `to`, or disconnects them when
    /// `to` is `None`.
    pub fn relink_output(&mut self, from: OutputRef, to: Option<OutputRef>) -> Result<(), CoreError> {
        self.assert_mutable();
        let consumers: Vec<InputRef> = self.links_of(from)?.to_vec();
        for input in consumers {
            self.disconnect_input(input)?;
            if let Some(to) = to {
                self.connect(to, input)?;
            }
        }
        Ok(())
    }

    /// Takes `node` out of the data flow: all its inputs are disconnected and
    /// the consumers of `from` are redirected to `to` (or disconnected).
    pub fn bypass(
        &mut self,
        node: NodeId,
        from: OutputRef,
        to: Option<OutputRef>,
    ) -> Result<(), CoreError> {
        self.assert_mutable();
        let consumers: Vec<InputRef> = self.links_of(from)?.to_vec();
        self.disconnect_node_inputs(node)?;
        for input in consumers {
            if self.input(input)?.is_linked() {
                self.disconnect_input(input)?;
            }
            if let Some(to) = to {
                self.connect(to, input)?;
            }
        }
        self.simplified = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subgraph utilities
    // -----------------------------------------------------------------------

    /// Every node transitively feeding `input`.
    ///
    /// Terminates on cyclic graphs.
    pub fn find_dependencies(&self, input: InputRef) -> Result<NodeSet, CoreError> {
        let mut deps = NodeSet::new();
        let mut stack: Vec<NodeId> = self.link_of(input)?.map(|o| o.node).into_iter().collect();

        while let Some(id) = stack.pop() {
            if !deps.insert(id) {
                continue;
            }
            for upstream in self.node(id)?.inputs.iter().filter_map(ShaderInput::link) {
                if !deps.contains(&upstream.node) {
                    stack.push(upstream.node);
                }
            }
        }

        Ok(deps)
    }

    /// Clones every node in `set` and recreates the links among the clones.
    ///
    /// Links from outside the set are not duplicated; the corresponding clone
    /// inputs are left unlinked with their literal values.
    pub fn clone_subgraph(&mut self, set: &NodeSet) -> Result<NodeMap, CoreError> {
        let mut map = NodeMap::new();
        for &id in set {
            let copy = self.node(id)?.clone_unlinked();
            map.insert(id, self.add(copy));
        }

        for (&original, &copy) in &map {
            let links: Vec<(usize, OutputRef)> = self
                .node(original)?
                .inputs
                .iter()
                .enumerate()
                .filter_map(|(slot, input)| input.link.map(|l| (slot, l)))
                .collect();

            for (slot, upstream) in links {
                if let Some(&upstream_copy) = map.get(&upstream.node) {
                    self.connect(
                        OutputRef {
                            node: upstream_copy,
                            slot: upstream.slot,
                        },
                        InputRef::new(copy, slot),
                    )?;
                }
            }
        }

        Ok(map)
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Panics once the graph has been finalized; every mutator calls this.
    fn assert_mutable(&self) {
        assert!(!self.finalized, "cannot mutate a finalized shader graph");
    }

    /// Verifies that both ends of every link agree.
    pub fn check_consistency(&self) -> Result<(), CoreError> {
        for (&id, node) in &self.nodes {
            for (slot, input) in node.inputs.iter().enumerate() {
                let Some(from) = input.link else { continue };
                let to = InputRef::new(id, slot);
                let listed = self
                    .nodes
                    .get(&from.node)
                    .and_then(|n| n.outputs.get(from.slot()))
                    .is_some_and(|o| o.links.contains(&to));
                if !listed {
                    return Err(CoreError::GraphInconsistency {
                        reason: format!("input {} links to {} which does not list it", to, from),
                    });
                }
            }
            for (slot, output) in node.outputs.iter().enumerate() {
                let from = OutputRef::new(id, slot);
                for to in &output.links {
                    let linked_back = self
                        .nodes
                        .get(&to.node)
                        .and_then(|n| n.inputs.get(to.slot()))
                        .is_some_and(|i| i.link == Some(from));
                    if !linked_back {
                        return Err(CoreError::GraphInconsistency {
                            reason: format!("output {} lists {} which does not link back", from, to),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Panics when [`check_consistency`](Self::check_consistency) fails.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        if let Err(e) = self.check_consistency() {
            panic!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SpecialType;
    use crate::math::MathType;

    fn math(graph: &mut ShaderGraph) -> NodeId {
        graph.add_node(NodeKind::Math {
            math_type: MathType::Add,
            use_clamp: false,
        })
    }

    #[test]
    fn new_graph_has_output_at_zero() {
        let graph = ShaderGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.output().id(), NodeId::OUTPUT);
        assert_eq!(graph.output().special_type(), SpecialType::Output);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let removed = NodeSet::from([a]);
        graph.remove_nodes(&removed).unwrap();
        let b = math(&mut graph);
        assert_ne!(a, b);
        assert_eq!(graph.id_bound(), 3);
    }

    #[test]
    fn connect_same_type_links_both_ends() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        let outcome = graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        assert_eq!(outcome, Connection::Linked);

        let to = graph.input_ref(b, "Value1").unwrap();
        let from = graph.output_ref(a, "Value").unwrap();
        assert_eq!(graph.link_of(to).unwrap(), Some(from));
        assert_eq!(graph.links_of(from).unwrap(), &[to]);
    }

    #[test]
    fn connect_already_linked_input_is_rejected() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        let c = math(&mut graph);
        graph.connect_by_name(a, "Value", c, "Value1").unwrap();
        let outcome = graph.connect_by_name(b, "Value", c, "Value1").unwrap();

        assert!(matches!(
            outcome,
            Connection::Rejected(GraphDiagnostic::InputAlreadyLinked { .. })
        ));
        let to = graph.input_ref(c, "Value1").unwrap();
        assert_eq!(graph.link_of(to).unwrap().map(|o| o.node), Some(a));
        assert_eq!(graph.diagnostics().len(), 1);
    }

    #[test]
    fn connect_mismatched_types_inserts_autoconvert() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let outcome = graph
            .connect_by_name(a, "Value", NodeId::OUTPUT, "Displacement")
            .unwrap();
        let Connection::Converted { node } = outcome else {
            panic!("expected conversion, got {outcome:?}");
        };

        let convert = graph.node(node).unwrap();
        assert_eq!(convert.special_type(), SpecialType::AutoConvert);
        assert_eq!(convert.inputs()[0].link().map(|o| o.node), Some(a));
        let disp = graph.input_ref(NodeId::OUTPUT, "Displacement").unwrap();
        assert_eq!(graph.link_of(disp).unwrap().map(|o| o.node), Some(node));
    }

    #[test]
    fn spatial_sockets_link_without_conversion() {
        let mut graph = ShaderGraph::new();
        let geom = graph.add_node(NodeKind::Geometry);
        let outcome = graph
            .connect_by_name(geom, "Position", NodeId::OUTPUT, "Normal")
            .unwrap();
        assert_eq!(outcome, Connection::Linked);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn float_into_closure_goes_through_emission_strength() {
        let mut graph = ShaderGraph::new();
        let value = graph.add_node(NodeKind::Value);
        let outcome = graph
            .connect_by_name(value, "Value", NodeId::OUTPUT, "Surface")
            .unwrap();
        let Connection::Converted { node } = outcome else {
            panic!("expected emission, got {outcome:?}");
        };

        let emission = graph.node(node).unwrap();
        assert_eq!(
            emission.kind,
            NodeKind::Emission {
                from_auto_conversion: true
            }
        );
        assert!(emission.is_linked("Strength"));
        assert!(!emission.is_linked("Color"));
        assert_eq!(emission.float3("Color"), [1.0; 3]);
    }

    #[test]
    fn color_into_closure_goes_through_emission_color() {
        let mut graph = ShaderGraph::new();
        let color = graph.add_node(NodeKind::Color);
        let Connection::Converted { node } = graph
            .connect_by_name(color, "Color", NodeId::OUTPUT, "Surface")
            .unwrap()
        else {
            panic!("expected emission");
        };
        let emission = graph.node(node).unwrap();
        assert!(emission.is_linked("Color"));
        assert!(!emission.is_linked("Strength"));
        assert_eq!(emission.float("Strength"), 1.0);
    }

    #[test]
    fn closure_into_non_closure_is_rejected() {
        let mut graph = ShaderGraph::new();
        let bsdf = graph.add_node(NodeKind::DiffuseBsdf);
        let before = graph.node_count();
        let outcome = graph
            .connect_by_name(bsdf, "BSDF", NodeId::OUTPUT, "Displacement")
            .unwrap();
        assert!(matches!(
            outcome,
            Connection::Rejected(GraphDiagnostic::ClosureConversion { .. })
        ));
        assert_eq!(graph.node_count(), before);
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn literal_only_input_is_rejected() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let value = graph.add_node(NodeKind::Value);
        let outcome = graph.connect_by_name(a, "Value", value, "Value").unwrap();
        assert!(matches!(
            outcome,
            Connection::Rejected(GraphDiagnostic::NotLinkable { .. })
        ));
    }

    #[test]
    fn disconnect_input_without_link_errors() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let input = graph.input_ref(a, "Value1").unwrap();
        assert!(matches!(
            graph.disconnect_input(input),
            Err(CoreError::InputNotLinked { .. })
        ));
    }

    #[test]
    fn disconnect_output_clears_all_consumers() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph.connect_by_name(a, "Value", b, "Value2").unwrap();
        graph.disconnect_output(graph.output_ref(a, "Value").unwrap()).unwrap();
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn relink_input_moves_link_and_copies_literal() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        let c = math(&mut graph);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph
            .node_mut(b)
            .unwrap()
            .set_input_value("Value1", SocketValue::Float(7.0));

        let from = graph.input_ref(b, "Value1").unwrap();
        let to = graph.input_ref(c, "Value2").unwrap();
        graph.relink_input(from, to).unwrap();

        assert_eq!(graph.link_of(from).unwrap(), None);
        assert_eq!(graph.link_of(to).unwrap().map(|o| o.node), Some(a));
        assert_eq!(graph.node(c).unwrap().float("Value2"), 7.0);
    }

    #[test]
    fn relink_output_redirects_consumers() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        let c = math(&mut graph);
        graph.connect_by_name(a, "Value", c, "Value1").unwrap();
        let from = graph.output_ref(a, "Value").unwrap();
        let to = graph.output_ref(b, "Value").unwrap();
        graph.relink_output(from, Some(to)).unwrap();
        assert!(graph.links_of(from).unwrap().is_empty());
        assert_eq!(graph.links_of(to).unwrap().len(), 1);

        graph.relink_output(to, None).unwrap();
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn bypass_detaches_node_inputs() {
        let mut graph = ShaderGraph::new();
        let src = math(&mut graph);
        let mid = math(&mut graph);
        let dst = math(&mut graph);
        graph.connect_by_name(src, "Value", mid, "Value1").unwrap();
        graph.connect_by_name(mid, "Value", dst, "Value1").unwrap();

        let from = graph.output_ref(mid, "Value").unwrap();
        let to = graph.output_ref(src, "Value").unwrap();
        graph.bypass(mid, from, Some(to)).unwrap();

        assert!(!graph.node(mid).unwrap().has_linked_inputs());
        let input = graph.input_ref(dst, "Value1").unwrap();
        assert_eq!(graph.link_of(input).unwrap().map(|o| o.node), Some(src));
    }

    #[test]
    fn find_dependencies_collects_upstream_in_id_order() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        let c = math(&mut graph);
        let unrelated = math(&mut graph);
        graph.connect_by_name(b, "Value", c, "Value1").unwrap();
        graph.connect_by_name(a, "Value", c, "Value2").unwrap();
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph
            .connect_by_name(c, "Value", NodeId::OUTPUT, "Displacement")
            .unwrap();

        let input = graph.input_ref(NodeId::OUTPUT, "Displacement").unwrap();
        let deps = graph.find_dependencies(input).unwrap();
        assert!(!deps.contains(&unrelated));
        assert!(deps.contains(&a) && deps.contains(&b) && deps.contains(&c));
        let ids: Vec<NodeId> = deps.iter().copied().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn find_dependencies_terminates_on_cycles() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph.connect_by_name(b, "Value", a, "Value1").unwrap();
        let input = graph.input_ref(a, "Value1").unwrap();
        let deps = graph.find_dependencies(input).unwrap();
        assert_eq!(deps, NodeSet::from([a, b]));
    }

    #[test]
    fn clone_subgraph_recreates_internal_links_only() {
        let mut graph = ShaderGraph::new();
        let outside = math(&mut graph);
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.connect_by_name(outside, "Value", a, "Value2").unwrap();
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph
            .node_mut(a)
            .unwrap()
            .set_input_value("Value1", SocketValue::Float(3.0));

        let map = graph.clone_subgraph(&NodeSet::from([a, b])).unwrap();
        let a2 = map[&a];
        let b2 = map[&b];

        let b2_in = graph.input_ref(b2, "Value1").unwrap();
        assert_eq!(graph.link_of(b2_in).unwrap().map(|o| o.node), Some(a2));
        assert!(!graph.node(a2).unwrap().is_linked("Value2"));
        assert_eq!(graph.node(a2).unwrap().float("Value1"), 3.0);
    }

    #[test]
    fn remove_nodes_keeps_output_and_severs_links() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        graph
            .remove_nodes(&NodeSet::from([NodeId::OUTPUT, a]))
            .unwrap();
        assert!(graph.contains(NodeId::OUTPUT));
        assert!(!graph.contains(a));
        assert!(!graph.node(b).unwrap().has_linked_inputs());
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn adding_after_finalize_panics() {
        let mut graph = ShaderGraph::new();
        graph.mark_finalized();
        graph.add_node(NodeKind::Value);
    }

    #[test]
    fn one_sided_link_is_reported_as_inconsistent() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();
        assert!(graph.check_consistency().is_ok());

        graph.node_mut(a).unwrap().outputs[0].links.clear();
        assert!(matches!(
            graph.check_consistency(),
            Err(CoreError::GraphInconsistency { .. })
        ));
    }

    fn finalized_with_displacement() -> (ShaderGraph, InputRef) {
        let mut graph = ShaderGraph::new();
        let value = graph.add_node(NodeKind::Value);
        graph
            .connect_by_name(value, "Value", NodeId::OUTPUT, "Displacement")
            .unwrap();
        let displacement = graph.input_ref(NodeId::OUTPUT, "Displacement").unwrap();
        graph.mark_finalized();
        (graph, displacement)
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn disconnecting_after_finalize_panics() {
        let (mut graph, displacement) = finalized_with_displacement();
        let _ = graph.disconnect_input(displacement);
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn connecting_after_finalize_panics() {
        let mut graph = ShaderGraph::new();
        let a = math(&mut graph);
        let b = math(&mut graph);
        graph.mark_finalized();
        let _ = graph.connect_by_name(a, "Value", b, "Value1");
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn relinking_after_finalize_panics() {
        let (mut graph, displacement) = finalized_with_displacement();
        let upstream = graph.link_of(displacement).unwrap().unwrap();
        let _ = graph.relink_output(upstream, None);
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn bypassing_after_finalize_panics() {
        let (mut graph, displacement) = finalized_with_displacement();
        let upstream = graph.link_of(displacement).unwrap().unwrap();
        let _ = graph.bypass(upstream.node, upstream, None);
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn setting_values_after_finalize_panics() {
        let (mut graph, displacement) = finalized_with_displacement();
        let _ = graph.set_value(displacement, &SocketValue::Float(0.5));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Arbitrary connect sequences keep both link ends in agreement
            /// and never give an input more than one upstream.
            #[test]
            fn connect_keeps_link_ends_in_sync(
                edges in prop::collection::vec((0usize..6, 0usize..6, 0usize..3), 0..24)
            ) {
                let mut graph = ShaderGraph::new();
                let ids: Vec<NodeId> = (0..6).map(|_| math(&mut graph)).collect();
                for (from, to, slot) in edges {
                    let from = graph.output_ref(ids[from], "Value").unwrap();
                    graph.connect(from, InputRef::new(ids[to], slot)).unwrap();
                }

                let fan_out: usize = graph
                    .nodes()
                    .flat_map(|n| n.outputs().iter())
                    .map(|o| o.links().len())
                    .sum();
                prop_assert_eq!(fan_out, graph.link_count());
            }

            /// A rejected connect leaves the graph structurally unchanged.
            #[test]
            fn second_connect_to_same_input_is_a_no_op(a in 0usize..4, b in 0usize..4) {
                let mut graph = ShaderGraph::new();
                let ids: Vec<NodeId> = (0..4).map(|_| math(&mut graph)).collect();
                let target = graph.input_ref(NodeId::OUTPUT, "Displacement").unwrap();
                let first = graph.output_ref(ids[a], "Value").unwrap();
                graph.connect(first, target).unwrap();
                let count = graph.node_count();
                let links = graph.link_count();

                let second = graph.output_ref(ids[b], "Value").unwrap();
                let outcome = graph.connect(second, target).unwrap();
                let rejected = matches!(outcome, Connection::Rejected(_));
                prop_assert!(rejected);
                prop_assert_eq!(graph.node_count(), count);
                prop_assert_eq!(graph.link_count(), links);
            }
        }
    }

    #[test]
    fn authoring_clears_simplified_flag() {
        let mut graph = ShaderGraph::new();
        graph.mark_simplified();
        assert!(graph.is_simplified());
        math(&mut graph);
        assert!(!graph.is_simplified());
    }
}
