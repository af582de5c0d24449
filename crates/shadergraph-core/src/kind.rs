//! The node catalog.
//!
//! [`NodeKind`] is a closed enum of every node the pipeline can hold. Each
//! variant carries its non-socket settings (enum modes, names, flags); the
//! literal values of its sockets live on the node's [`ShaderInput`]s. The
//! socket layout for a kind is produced by [`NodeKind::sockets`].
//!
//! # Socket names
//!
//! Socket names are part of the contract: passes look sockets up by name
//! (`"Displacement"`, `"SurfaceMixWeight"`, `"Fac"` ...), and the
//! auto-conversion node names its sockets `value_<type>`.

use serde::{Deserialize, Serialize};

use crate::math::{ClampType, MathType, MixType, VectorMathType};
use crate::socket::{DefaultLink, ShaderInput, ShaderOutput, SocketType, SocketValue};

/// Number of closure slots a volume closure reserves.
pub const VOLUME_STACK_SIZE: u32 = 32;

/// Space a displacement node interprets its height in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplacementSpace {
    #[default]
    Object,
    World,
}

/// A socket declared by an OSL script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OslSocket {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
}

/// A node whose behaviour comes from an externally compiled OSL script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OslNode {
    pub name: String,
    /// Hash of the compiled bytecode; part of the displacement hash.
    #[serde(default)]
    pub bytecode_hash: String,
    #[serde(default)]
    pub inputs: Vec<OslSocket>,
    #[serde(default)]
    pub outputs: Vec<OslSocket>,
}

/// Structural classification used by the passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialType {
    None,
    /// Same-type conversion; removed before anything else runs.
    Proxy,
    /// Conversion inserted by `connect`.
    AutoConvert,
    /// Mix/add closure.
    CombineClosure,
    Closure,
    Output,
    OutputAov,
    Osl,
    Bump,
    Geometry,
}

/// Closure families, which differ in how many kernel slots they occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClosureKind {
    Bsdf,
    Bssrdf,
    Principled,
    Volume,
    Emission,
}

impl ClosureKind {
    /// Closure slots consumed by one node of this family.
    pub fn slot_cost(self) -> u32 {
        match self {
            ClosureKind::Bsdf | ClosureKind::Emission => 1,
            ClosureKind::Bssrdf => 3,
            ClosureKind::Principled => 12,
            ClosureKind::Volume => VOLUME_STACK_SIZE,
        }
    }
}

/// Every kind of node the graph can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// The graph root. Always node 0.
    Output,
    /// Writes a value or colour to a named render pass.
    AovOutput { name: String },
    /// Literal float.
    Value,
    /// Literal colour.
    Color,
    /// Type conversion. A conversion with `from == to` is a proxy.
    Convert {
        from: SocketType,
        to: SocketType,
        #[serde(default)]
        autoconvert: bool,
    },
    Emission {
        #[serde(default)]
        from_auto_conversion: bool,
    },
    DiffuseBsdf,
    PrincipledBsdf,
    SubsurfaceScattering,
    AbsorptionVolume,
    ScatterVolume,
    MixClosure,
    AddClosure,
    /// Splits one closure weight into two by a factor.
    MixClosureWeight,
    Math {
        #[serde(default)]
        math_type: MathType,
        #[serde(default)]
        use_clamp: bool,
    },
    Clamp {
        #[serde(default)]
        clamp_type: ClampType,
    },
    VectorMath {
        #[serde(default)]
        math_type: VectorMathType,
    },
    Mix {
        #[serde(default)]
        mix_type: MixType,
        #[serde(default)]
        use_clamp: bool,
    },
    Geometry,
    TextureCoordinate,
    /// Reads a named geometry attribute.
    Attribute { name: String },
    ImageTexture { filename: String },
    Bump {
        #[serde(default)]
        invert: bool,
        #[serde(default)]
        use_object_space: bool,
    },
    SetNormal,
    Displacement {
        #[serde(default)]
        space: DisplacementSpace,
    },
    Osl(OslNode),
}

fn float(name: &str, v: f32) -> ShaderInput {
    ShaderInput::new(name, SocketType::Float, SocketValue::Float(v))
}

fn float3(name: &str, ty: SocketType, v: f32) -> ShaderInput {
    ShaderInput::new(name, ty, SocketValue::Float3([v; 3]))
}

fn closure(name: &str) -> ShaderInput {
    ShaderInput::new(name, SocketType::Closure, SocketValue::Closure)
}

fn normal_in() -> ShaderInput {
    float3("Normal", SocketType::Normal, 0.0).with_default_link(DefaultLink::Normal)
}

fn out(name: &str, ty: SocketType) -> ShaderOutput {
    ShaderOutput::new(name, ty)
}

impl NodeKind {
    /// The proxy conversion for `ty`.
    pub fn proxy(ty: SocketType) -> Self {
        NodeKind::Convert {
            from: ty,
            to: ty,
            autoconvert: false,
        }
    }

    /// Type name used for deduplication buckets and in dumps.
    pub fn type_name(&self) -> String {
        let name = match self {
            NodeKind::Output => "output",
            NodeKind::AovOutput { .. } => "aov_output",
            NodeKind::Value => "value",
            NodeKind::Color => "color",
            NodeKind::Convert { from, to, .. } => {
                return format!("convert_{}_to_{}", from.name(), to.name())
            }
            NodeKind::Emission { .. } => "emission",
            NodeKind::DiffuseBsdf => "diffuse_bsdf",
            NodeKind::PrincipledBsdf => "principled_bsdf",
            NodeKind::SubsurfaceScattering => "subsurface_scattering",
            NodeKind::AbsorptionVolume => "absorption_volume",
            NodeKind::ScatterVolume => "scatter_volume",
            NodeKind::MixClosure => "mix_closure",
            NodeKind::AddClosure => "add_closure",
            NodeKind::MixClosureWeight => "mix_closure_weight",
            NodeKind::Math { .. } => "math",
            NodeKind::Clamp { .. } => "clamp",
            NodeKind::VectorMath { .. } => "vector_math",
            NodeKind::Mix { .. } => "mix",
            NodeKind::Geometry => "geometry",
            NodeKind::TextureCoordinate => "texture_coordinate",
            NodeKind::Attribute { .. } => "attribute",
            NodeKind::ImageTexture { .. } => "image_texture",
            NodeKind::Bump { .. } => "bump",
            NodeKind::SetNormal => "set_normal",
            NodeKind::Displacement { .. } => "displacement",
            NodeKind::Osl(osl) => return format!("osl_{}", osl.name),
        };
        name.to_string()
    }

    pub fn special_type(&self) -> SpecialType {
        match self {
            NodeKind::Output => SpecialType::Output,
            NodeKind::AovOutput { .. } => SpecialType::OutputAov,
            NodeKind::Convert { from, to, .. } if from == to => SpecialType::Proxy,
            NodeKind::Convert {
                autoconvert: true, ..
            } => SpecialType::AutoConvert,
            NodeKind::MixClosure | NodeKind::AddClosure => SpecialType::CombineClosure,
            NodeKind::Emission { .. }
            | NodeKind::DiffuseBsdf
            | NodeKind::PrincipledBsdf
            | NodeKind::SubsurfaceScattering
            | NodeKind::AbsorptionVolume
            | NodeKind::ScatterVolume => SpecialType::Closure,
            NodeKind::Osl(_) => SpecialType::Osl,
            NodeKind::Bump { .. } => SpecialType::Bump,
            NodeKind::Geometry => SpecialType::Geometry,
            _ => SpecialType::None,
        }
    }

    pub fn closure_kind(&self) -> Option<ClosureKind> {
        match self {
            NodeKind::Emission { .. } => Some(ClosureKind::Emission),
            NodeKind::DiffuseBsdf => Some(ClosureKind::Bsdf),
            NodeKind::PrincipledBsdf => Some(ClosureKind::Principled),
            NodeKind::SubsurfaceScattering => Some(ClosureKind::Bssrdf),
            NodeKind::AbsorptionVolume | NodeKind::ScatterVolume => Some(ClosureKind::Volume),
            _ => None,
        }
    }

    /// Whether this node can contribute to a volume shader.
    pub fn has_volume_support(&self) -> bool {
        matches!(
            self,
            NodeKind::AbsorptionVolume | NodeKind::ScatterVolume | NodeKind::Emission { .. }
        )
    }

    /// Builds the fresh socket layout for this kind, with default literals.
    pub fn sockets(&self) -> (Vec<ShaderInput>, Vec<ShaderOutput>) {
        use SocketType as T;

        match self {
            NodeKind::Output => (
                vec![
                    closure("Surface"),
                    closure("Volume"),
                    float3("Displacement", T::Vector, 0.0),
                    float3("Normal", T::Normal, 0.0),
                ],
                vec![],
            ),
            NodeKind::AovOutput { .. } => (
                vec![float3("Color", T::Color, 0.0), float("Value", 0.0)],
                vec![],
            ),
            NodeKind::Value => (
                vec![ShaderInput::literal("Value", T::Float, SocketValue::Float(0.0))],
                vec![out("Value", T::Float)],
            ),
            NodeKind::Color => (
                vec![ShaderInput::literal(
                    "Value",
                    T::Color,
                    SocketValue::Float3([0.0; 3]),
                )],
                vec![out("Color", T::Color)],
            ),
            NodeKind::Convert { from, to, .. } => (
                vec![ShaderInput::new(
                    format!("value_{}", from.name()),
                    *from,
                    from.zero(),
                )],
                vec![out(&format!("value_{}", to.name()), *to)],
            ),
            NodeKind::Emission { .. } => (
                vec![
                    float3("Color", T::Color, 0.8),
                    float("Strength", 10.0),
                    float("SurfaceMixWeight", 0.0),
                    float("VolumeMixWeight", 0.0),
                ],
                vec![out("Emission", T::Closure)],
            ),
            NodeKind::DiffuseBsdf => (
                vec![
                    float3("Color", T::Color, 0.8),
                    float("Roughness", 0.0),
                    normal_in(),
                    float("SurfaceMixWeight", 0.0),
                ],
                vec![out("BSDF", T::Closure)],
            ),
            NodeKind::PrincipledBsdf => (
                vec![
                    float3("Base Color", T::Color, 0.8),
                    float("Metallic", 0.0),
                    float("Roughness", 0.5),
                    normal_in(),
                    float("SurfaceMixWeight", 0.0),
                ],
                vec![out("BSDF", T::Closure)],
            ),
            NodeKind::SubsurfaceScattering => (
                vec![
                    float3("Color", T::Color, 0.8),
                    float("Scale", 1.0),
                    float3("Radius", T::Vector, 0.1),
                    normal_in(),
                    float("SurfaceMixWeight", 0.0),
                ],
                vec![out("BSSRDF", T::Closure)],
            ),
            NodeKind::AbsorptionVolume => (
                vec![
                    float3("Color", T::Color, 0.8),
                    float("Density", 1.0),
                    float("VolumeMixWeight", 0.0),
                ],
                vec![out("Volume", T::Closure)],
            ),
            NodeKind::ScatterVolume => (
                vec![
                    float3("Color", T::Color, 0.8),
                    float("Density", 1.0),
                    float("Anisotropy", 0.0),
                    float("VolumeMixWeight", 0.0),
                ],
                vec![out("Volume", T::Closure)],
            ),
            NodeKind::MixClosure => (
                vec![float("Fac", 0.5), closure("Closure1"), closure("Closure2")],
                vec![out("Closure", T::Closure)],
            ),
            NodeKind::AddClosure => (
                vec![closure("Closure1"), closure("Closure2")],
                vec![out("Closure", T::Closure)],
            ),
            NodeKind::MixClosureWeight => (
                vec![float("Weight", 1.0), float("Fac", 1.0)],
                vec![out("Weight1", T::Float), out("Weight2", T::Float)],
            ),
            NodeKind::Math { .. } => (
                vec![
                    float("Value1", 0.5),
                    float("Value2", 0.5),
                    float("Value3", 0.0),
                ],
                vec![out("Value", T::Float)],
            ),
            NodeKind::Clamp { .. } => (
                vec![float("Value", 1.0), float("Min", 0.0), float("Max", 1.0)],
                vec![out("Result", T::Float)],
            ),
            NodeKind::VectorMath { .. } => (
                vec![
                    float3("Vector1", T::Vector, 0.0),
                    float3("Vector2", T::Vector, 0.0),
                    float3("Vector3", T::Vector, 0.0),
                    float("Scale", 1.0),
                ],
                vec![out("Value", T::Float), out("Vector", T::Vector)],
            ),
            NodeKind::Mix { .. } => (
                vec![
                    float("Fac", 0.5),
                    float3("Color1", T::Color, 0.0),
                    float3("Color2", T::Color, 0.0),
                ],
                vec![out("Color", T::Color)],
            ),
            NodeKind::Geometry => (
                vec![],
                vec![
                    out("Position", T::Point),
                    out("Normal", T::Normal),
                    out("Tangent", T::Normal),
                    out("True Normal", T::Normal),
                    out("Incoming", T::Vector),
                    out("Parametric", T::Point),
                    out("Backfacing", T::Float),
                ],
            ),
            NodeKind::TextureCoordinate => (
                vec![],
                vec![
                    out("Generated", T::Point),
                    out("Normal", T::Normal),
                    out("UV", T::Point),
                    out("Object", T::Point),
                ],
            ),
            NodeKind::Attribute { .. } => (
                vec![],
                vec![
                    out("Color", T::Color),
                    out("Vector", T::Vector),
                    out("Fac", T::Float),
                    out("Alpha", T::Float),
                ],
            ),
            NodeKind::ImageTexture { .. } => (
                vec![float3("Vector", T::Point, 0.0).with_default_link(DefaultLink::TextureUv)],
                vec![out("Color", T::Color), out("Alpha", T::Float)],
            ),
            NodeKind::Bump { .. } => (
                vec![
                    float("Height", 1.0),
                    float("SampleCenter", 0.0),
                    float("SampleX", 0.0),
                    float("SampleY", 0.0),
                    normal_in(),
                    float("Strength", 1.0),
                    float("Distance", 0.1),
                    float("Filter Width", 0.1),
                ],
                vec![out("Normal", T::Normal)],
            ),
            NodeKind::SetNormal => (
                vec![float3("Direction", T::Vector, 0.0)],
                vec![out("Normal", T::Normal)],
            ),
            NodeKind::Displacement { .. } => (
                vec![
                    float("Height", 0.0),
                    float("Midlevel", 0.5),
                    float("Scale", 1.0),
                    normal_in(),
                ],
                vec![out("Displacement", T::Vector)],
            ),
            NodeKind::Osl(osl) => (
                osl.inputs
                    .iter()
                    .map(|s| ShaderInput::new(s.name.clone(), s.ty, s.ty.zero()))
                    .collect(),
                osl.outputs
                    .iter()
                    .map(|s| ShaderOutput::new(s.name.clone(), s.ty))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_convert_is_proxy() {
        assert_eq!(
            NodeKind::proxy(SocketType::Color).special_type(),
            SpecialType::Proxy
        );
        let auto = NodeKind::Convert {
            from: SocketType::Float,
            to: SocketType::Color,
            autoconvert: true,
        };
        assert_eq!(auto.special_type(), SpecialType::AutoConvert);
        assert_eq!(auto.type_name(), "convert_float_to_color");
    }

    #[test]
    fn convert_sockets_are_named_by_type() {
        let (inputs, outputs) = NodeKind::Convert {
            from: SocketType::Float,
            to: SocketType::Vector,
            autoconvert: false,
        }
        .sockets();
        assert_eq!(inputs[0].name, "value_float");
        assert_eq!(outputs[0].name, "value_vector");
    }

    #[test]
    fn output_node_layout() {
        let (inputs, outputs) = NodeKind::Output.sockets();
        let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Surface", "Volume", "Displacement", "Normal"]);
        assert!(outputs.is_empty());
    }

    #[test]
    fn closure_slot_costs() {
        assert_eq!(ClosureKind::Bsdf.slot_cost(), 1);
        assert_eq!(ClosureKind::Bssrdf.slot_cost(), 3);
        assert_eq!(ClosureKind::Principled.slot_cost(), 12);
        assert_eq!(ClosureKind::Volume.slot_cost(), VOLUME_STACK_SIZE);
    }

    #[test]
    fn kinds_deserialize_from_tagged_json() {
        let kind: NodeKind =
            serde_json::from_str(r#"{"type": "math", "math_type": "multiply"}"#).unwrap();
        assert_eq!(
            kind,
            NodeKind::Math {
                math_type: MathType::Multiply,
                use_clamp: false
            }
        );

        let kind: NodeKind = serde_json::from_str(r#"{"type": "geometry"}"#).unwrap();
        assert_eq!(kind, NodeKind::Geometry);
    }

    #[test]
    fn osl_sockets_follow_declaration() {
        let kind = NodeKind::Osl(OslNode {
            name: "noise".into(),
            bytecode_hash: "abc".into(),
            inputs: vec![OslSocket {
                name: "Scale".into(),
                ty: SocketType::Float,
            }],
            outputs: vec![OslSocket {
                name: "Fac".into(),
                ty: SocketType::Float,
            }],
        });
        let (inputs, outputs) = kind.sockets();
        assert_eq!(inputs[0].name, "Scale");
        assert_eq!(outputs[0].name, "Fac");
        assert_eq!(kind.special_type(), SpecialType::Osl);
    }
}
