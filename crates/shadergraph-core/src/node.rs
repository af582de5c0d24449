//! Shader nodes: a [`NodeKind`] plus its owned sockets and per-node state.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::kind::{ClosureKind, NodeKind, SpecialType};
use crate::math::{MathType, MixType, VectorMathType};
use crate::socket::{ShaderInput, ShaderOutput, SocketValue};

/// Finite-difference role of a node inside a bump subgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BumpState {
    #[default]
    None,
    Center,
    Dx,
    Dy,
}

/// A node in the shading graph.
///
/// Sockets are exposed read-only; literal values can be changed through
/// [`ShaderNode::set_input_value`], while links only change through
/// [`ShaderGraph`](crate::graph::ShaderGraph).
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub(crate) id: NodeId,
    pub kind: NodeKind,
    pub(crate) inputs: Vec<ShaderInput>,
    pub(crate) outputs: Vec<ShaderOutput>,
    pub bump: BumpState,
    pub bump_filter_width: f32,
    /// Cleared when the node is reached non-linearly from a volume output.
    pub stochastic_sample: bool,
    pub(crate) expanded: bool,
}

impl ShaderNode {
    /// Creates an unattached node with the default socket layout of `kind`.
    pub fn new(kind: NodeKind) -> Self {
        let (inputs, outputs) = kind.sockets();
        ShaderNode {
            id: NodeId(u32::MAX),
            kind,
            inputs,
            outputs,
            bump: BumpState::None,
            bump_filter_width: 0.0,
            stochastic_sample: true,
            expanded: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> String {
        self.kind.type_name()
    }

    pub fn special_type(&self) -> SpecialType {
        self.kind.special_type()
    }

    pub fn closure_kind(&self) -> Option<ClosureKind> {
        self.kind.closure_kind()
    }

    pub fn has_volume_support(&self) -> bool {
        self.kind.has_volume_support()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    // -----------------------------------------------------------------------
    // Sockets
    // -----------------------------------------------------------------------

    pub fn inputs(&self) -> &[ShaderInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ShaderOutput] {
        &self.outputs
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&ShaderInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&ShaderOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Literal value of the named input, or `None` if there is no such input.
    pub fn value(&self, name: &str) -> Option<&SocketValue> {
        self.input(name).map(|i| &i.value)
    }

    /// Float literal of the named input; zero when absent or non-scalar.
    pub fn float(&self, name: &str) -> f32 {
        self.value(name).and_then(SocketValue::as_float).unwrap_or(0.0)
    }

    /// Float3 literal of the named input; zero when absent or not a float3.
    pub fn float3(&self, name: &str) -> [f32; 3] {
        self.value(name)
            .and_then(SocketValue::as_float3)
            .unwrap_or([0.0; 3])
    }

    pub fn is_linked(&self, name: &str) -> bool {
        self.input(name).is_some_and(ShaderInput::is_linked)
    }

    /// Sets the literal of the named input, converting to the socket type.
    /// Returns `false` when the node has no such input.
    pub fn set_input_value(&mut self, name: &str, value: SocketValue) -> bool {
        match self.inputs.iter_mut().find(|i| i.name == name) {
            Some(input) => {
                input.set_value(&value);
                true
            }
            None => false,
        }
    }

    pub fn has_linked_inputs(&self) -> bool {
        self.inputs.iter().any(ShaderInput::is_linked)
    }

    pub fn has_output_links(&self) -> bool {
        self.outputs.iter().any(ShaderOutput::has_links)
    }

    /// Index of the closure weight socket for surface or volume flattening.
    pub fn mix_weight_input(&self, volume: bool) -> Option<usize> {
        self.input_index(if volume {
            "VolumeMixWeight"
        } else {
            "SurfaceMixWeight"
        })
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Whether the node's result depends linearly on its linked inputs.
    ///
    /// Used by volume verification: anything upstream of a non-linear node
    /// cannot be sampled stochastically.
    pub fn is_linear_operation(&self) -> bool {
        let num_linked = self.inputs.iter().filter(|i| i.is_linked()).count();
        match &self.kind {
            NodeKind::Math { math_type, .. } => match math_type {
                MathType::Add | MathType::Subtract | MathType::Multiply | MathType::MultiplyAdd => {
                    num_linked <= 1
                }
                MathType::Divide => !self.is_linked("Value2"),
                _ => false,
            },
            NodeKind::VectorMath { math_type } => match math_type {
                VectorMathType::Add
                | VectorMathType::Subtract
                | VectorMathType::Multiply
                | VectorMathType::MultiplyAdd => num_linked <= 1,
                VectorMathType::Divide => !self.is_linked("Vector2"),
                _ => false,
            },
            NodeKind::Mix {
                mix_type,
                use_clamp,
            } => {
                matches!(
                    mix_type,
                    MixType::Blend | MixType::Add | MixType::Multiply | MixType::Subtract
                ) && !use_clamp
                    && !self.is_linked("Fac")
            }
            NodeKind::Convert { .. } | NodeKind::MixClosure | NodeKind::AddClosure => true,
            kind => kind.has_volume_support(),
        }
    }

    /// Structural equality used by deduplication.
    ///
    /// Compares type, bump state, kind settings, literal-only values and the
    /// literals of inputs unlinked on both sides. An input linked on only one
    /// side makes the nodes unequal; inputs linked on both sides are left to
    /// the caller, which compares upstream identity.
    pub fn equals(&self, other: &ShaderNode) -> bool {
        if self.kind != other.kind
            || self.bump != other.bump
            || self.inputs.len() != other.inputs.len()
        {
            return false;
        }

        self.inputs
            .iter()
            .zip(other.inputs.iter())
            .all(|(a, b)| match (a.link, b.link) {
                (None, None) => a.value == b.value,
                (Some(_), Some(_)) => true,
                _ => false,
            })
    }

    /// Copies the node with fresh unlinked sockets and no id.
    ///
    /// Literal values, settings and bump state are preserved.
    pub fn clone_unlinked(&self) -> ShaderNode {
        let mut copy = self.clone();
        copy.id = NodeId(u32::MAX);
        copy.expanded = false;
        for input in &mut copy.inputs {
            input.link = None;
        }
        for output in &mut copy.outputs {
            output.links.clear();
        }
        copy
    }

    /// Feeds the node's content (type, settings, literal values) into
    /// `hasher`. Links are not part of the content hash.
    pub fn hash(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.type_name().as_bytes());
        let settings = serde_json::to_vec(&self.kind)
            .expect("NodeKind serialization should never fail");
        hasher.update(&settings);
        hasher.update(&[self.bump as u8]);
        for input in &self.inputs {
            hasher.update(input.name.as_bytes());
            input.value.hash_into(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketType;

    fn math(math_type: MathType) -> ShaderNode {
        ShaderNode::new(NodeKind::Math {
            math_type,
            use_clamp: false,
        })
    }

    #[test]
    fn new_node_has_kind_defaults() {
        let node = ShaderNode::new(NodeKind::Emission {
            from_auto_conversion: false,
        });
        assert_eq!(node.float("Strength"), 10.0);
        assert_eq!(node.float3("Color"), [0.8; 3]);
        assert!(node.stochastic_sample);
        assert_eq!(node.bump, BumpState::None);
    }

    #[test]
    fn set_input_value_converts() {
        let mut node = ShaderNode::new(NodeKind::Mix {
            mix_type: MixType::Blend,
            use_clamp: false,
        });
        assert!(node.set_input_value("Color1", SocketValue::Float(0.25)));
        assert_eq!(node.float3("Color1"), [0.25; 3]);
        assert!(!node.set_input_value("Nope", SocketValue::Float(1.0)));
    }

    #[test]
    fn equal_literals_compare_equal() {
        let a = math(MathType::Add);
        let b = math(MathType::Add);
        assert!(a.equals(&b));
    }

    #[test]
    fn different_settings_or_literals_differ() {
        let a = math(MathType::Add);
        assert!(!a.equals(&math(MathType::Multiply)));

        let mut b = math(MathType::Add);
        b.set_input_value("Value1", SocketValue::Float(3.0));
        assert!(!a.equals(&b));

        let mut c = math(MathType::Add);
        c.bump = BumpState::Dx;
        assert!(!a.equals(&c));
    }

    #[test]
    fn mix_weight_inputs() {
        let node = ShaderNode::new(NodeKind::Emission {
            from_auto_conversion: false,
        });
        assert_eq!(node.mix_weight_input(false), Some(2));
        assert_eq!(node.mix_weight_input(true), Some(3));
        let diffuse = ShaderNode::new(NodeKind::DiffuseBsdf);
        assert_eq!(diffuse.mix_weight_input(true), None);
    }

    #[test]
    fn unlinked_math_is_linear_but_power_is_not() {
        assert!(math(MathType::Multiply).is_linear_operation());
        assert!(!math(MathType::Power).is_linear_operation());
        assert!(!ShaderNode::new(NodeKind::ImageTexture {
            filename: "a.png".into()
        })
        .is_linear_operation());
    }

    #[test]
    fn content_hash_tracks_literals() {
        let digest = |n: &ShaderNode| {
            let mut h = blake3::Hasher::new();
            n.hash(&mut h);
            h.finalize()
        };
        let a = ShaderNode::new(NodeKind::Value);
        let mut b = ShaderNode::new(NodeKind::Value);
        assert_eq!(digest(&a), digest(&b));
        b.set_input_value("Value", SocketValue::Float(2.0));
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn clone_unlinked_keeps_values() {
        let mut node = ShaderNode::new(NodeKind::Value);
        node.set_input_value("Value", SocketValue::Float(4.0));
        node.bump = BumpState::Center;
        let copy = node.clone_unlinked();
        assert_eq!(copy.float("Value"), 4.0);
        assert_eq!(copy.bump, BumpState::Center);
        assert_eq!(copy.inputs()[0].ty, SocketType::Float);
    }
}
