//! Typed sockets and the literal values they carry.
//!
//! Every node owns a fixed list of [`ShaderInput`]s and [`ShaderOutput`]s.
//! An input holds a literal [`SocketValue`] and at most one upstream link; an
//! output holds the fan-out list of inputs it feeds. Both ends of a link are
//! only ever mutated together, through
//! [`ShaderGraph`](crate::graph::ShaderGraph) primitives, which is why the
//! link fields are crate-private.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{InputRef, OutputRef};

/// Static type of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    Boolean,
    Float,
    Int,
    Color,
    Vector,
    Point,
    Normal,
    String,
    Closure,
}

impl SocketType {
    /// Colour, vector, point and normal share the same three-float storage.
    pub fn is_float3(self) -> bool {
        matches!(
            self,
            SocketType::Color | SocketType::Vector | SocketType::Point | SocketType::Normal
        )
    }

    /// Vector, point and normal sockets link to each other without an
    /// intermediate conversion node.
    pub fn links_directly_to(self, other: SocketType) -> bool {
        let spatial = |ty| matches!(ty, SocketType::Vector | SocketType::Point | SocketType::Normal);
        self == other || (spatial(self) && spatial(other))
    }

    /// Lowercase name used to build conversion node and socket names.
    pub fn name(self) -> &'static str {
        match self {
            SocketType::Boolean => "boolean",
            SocketType::Float => "float",
            SocketType::Int => "int",
            SocketType::Color => "color",
            SocketType::Vector => "vector",
            SocketType::Point => "point",
            SocketType::Normal => "normal",
            SocketType::String => "string",
            SocketType::Closure => "closure",
        }
    }

    /// The zero literal for this type.
    pub fn zero(self) -> SocketValue {
        match self {
            SocketType::Boolean => SocketValue::Boolean(false),
            SocketType::Float => SocketValue::Float(0.0),
            SocketType::Int => SocketValue::Int(0),
            SocketType::Color | SocketType::Vector | SocketType::Point | SocketType::Normal => {
                SocketValue::Float3([0.0; 3])
            }
            SocketType::String => SocketValue::String(String::new()),
            SocketType::Closure => SocketValue::Closure,
        }
    }
}

/// A literal held by an input socket.
///
/// Closure sockets carry no literal; their value is always
/// [`SocketValue::Closure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SocketValue {
    Boolean(bool),
    Float(f32),
    Int(i32),
    Float3([f32; 3]),
    String(String),
    Closure,
}

/// Rec. 709 luminance weights used when a colour collapses to a scalar.
const LUMINANCE: [f32; 3] = [0.2126, 0.7152, 0.0722];

impl SocketValue {
    /// Converts this literal to the storage shape of `ty`.
    ///
    /// Scalars splat into float3, float3 averages into scalars (colours use
    /// luminance when `from_color` is set), ints truncate.
    pub fn convert(&self, ty: SocketType, from_color: bool) -> SocketValue {
        let scalar = |v: &SocketValue| -> f32 {
            match v {
                SocketValue::Boolean(b) => f32::from(u8::from(*b)),
                SocketValue::Float(f) => *f,
                SocketValue::Int(i) => *i as f32,
                SocketValue::Float3(c) if from_color => {
                    c[0] * LUMINANCE[0] + c[1] * LUMINANCE[1] + c[2] * LUMINANCE[2]
                }
                SocketValue::Float3(c) => (c[0] + c[1] + c[2]) / 3.0,
                SocketValue::String(_) | SocketValue::Closure => 0.0,
            }
        };

        match ty {
            SocketType::Float => SocketValue::Float(scalar(self)),
            SocketType::Int => SocketValue::Int(scalar(self) as i32),
            SocketType::Boolean => SocketValue::Boolean(scalar(self) != 0.0),
            SocketType::Color | SocketType::Vector | SocketType::Point | SocketType::Normal => {
                match self {
                    SocketValue::Float3(c) => SocketValue::Float3(*c),
                    other => {
                        let v = scalar(other);
                        SocketValue::Float3([v, v, v])
                    }
                }
            }
            SocketType::String => match self {
                SocketValue::String(s) => SocketValue::String(s.clone()),
                _ => SocketValue::String(String::new()),
            },
            SocketType::Closure => SocketValue::Closure,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            SocketValue::Float(f) => Some(*f),
            SocketValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<[f32; 3]> {
        match self {
            SocketValue::Float3(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SocketValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// True for a scalar `0` or an all-zero float3.
    pub fn is_zero(&self) -> bool {
        match self {
            SocketValue::Float(f) => *f == 0.0,
            SocketValue::Int(i) => *i == 0,
            SocketValue::Float3(c) => c.iter().all(|v| *v == 0.0),
            _ => false,
        }
    }

    /// True for a scalar `1` or an all-one float3.
    pub fn is_one(&self) -> bool {
        match self {
            SocketValue::Float(f) => *f == 1.0,
            SocketValue::Int(i) => *i == 1,
            SocketValue::Float3(c) => c.iter().all(|v| *v == 1.0),
            _ => false,
        }
    }

    /// Feeds a tagged byte encoding of the literal into `hasher`.
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        match self {
            SocketValue::Boolean(b) => {
                hasher.update(&[0, u8::from(*b)]);
            }
            SocketValue::Float(f) => {
                hasher.update(&[1]);
                hasher.update(&f.to_le_bytes());
            }
            SocketValue::Int(i) => {
                hasher.update(&[2]);
                hasher.update(&i.to_le_bytes());
            }
            SocketValue::Float3(c) => {
                hasher.update(&[3]);
                for v in c {
                    hasher.update(&v.to_le_bytes());
                }
            }
            SocketValue::String(s) => {
                hasher.update(&[4]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
            SocketValue::Closure => {
                hasher.update(&[5]);
            }
        }
    }
}

/// Source that an unlinked input is wired to by the default-inputs pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultLink {
    TextureGenerated,
    TextureNormal,
    TextureUv,
    Incoming,
    Normal,
    Position,
    Tangent,
}

/// Static per-socket flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketFlags {
    /// Non-linkable sockets only ever hold literals.
    pub linkable: bool,
    pub default_link: Option<DefaultLink>,
}

impl SocketFlags {
    pub const LINKABLE: SocketFlags = SocketFlags {
        linkable: true,
        default_link: None,
    };

    pub const LITERAL: SocketFlags = SocketFlags {
        linkable: false,
        default_link: None,
    };

    pub fn with_default_link(link: DefaultLink) -> Self {
        SocketFlags {
            linkable: true,
            default_link: Some(link),
        }
    }
}

/// An input socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderInput {
    pub name: String,
    pub ty: SocketType,
    pub value: SocketValue,
    pub flags: SocketFlags,
    pub(crate) link: Option<OutputRef>,
}

impl ShaderInput {
    pub fn new(name: impl Into<String>, ty: SocketType, value: SocketValue) -> Self {
        ShaderInput {
            name: name.into(),
            ty,
            value,
            flags: SocketFlags::LINKABLE,
            link: None,
        }
    }

    /// A literal-only socket.
    pub fn literal(name: impl Into<String>, ty: SocketType, value: SocketValue) -> Self {
        ShaderInput {
            flags: SocketFlags::LITERAL,
            ..ShaderInput::new(name, ty, value)
        }
    }

    pub fn with_default_link(mut self, link: DefaultLink) -> Self {
        self.flags = SocketFlags::with_default_link(link);
        self
    }

    /// The upstream output feeding this input, if any.
    pub fn link(&self) -> Option<OutputRef> {
        self.link
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Stores `value`, converted to this socket's type.
    pub fn set_value(&mut self, value: &SocketValue) {
        self.value = value.convert(self.ty, false);
    }
}

/// An output socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderOutput {
    pub name: String,
    pub ty: SocketType,
    pub(crate) links: SmallVec<[InputRef; 4]>,
}

impl ShaderOutput {
    pub fn new(name: impl Into<String>, ty: SocketType) -> Self {
        ShaderOutput {
            name: name.into(),
            ty,
            links: SmallVec::new(),
        }
    }

    /// Every input this output currently feeds.
    pub fn links(&self) -> &[InputRef] {
        &self.links
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float3_family() {
        assert!(SocketType::Color.is_float3());
        assert!(SocketType::Normal.is_float3());
        assert!(!SocketType::Float.is_float3());
        assert!(!SocketType::Closure.is_float3());
    }

    #[test]
    fn spatial_types_link_directly() {
        assert!(SocketType::Normal.links_directly_to(SocketType::Vector));
        assert!(SocketType::Point.links_directly_to(SocketType::Normal));
        assert!(!SocketType::Color.links_directly_to(SocketType::Vector));
        assert!(!SocketType::Float.links_directly_to(SocketType::Vector));
    }

    #[test]
    fn scalar_splats_into_float3() {
        let v = SocketValue::Float(2.0).convert(SocketType::Vector, false);
        assert_eq!(v, SocketValue::Float3([2.0, 2.0, 2.0]));
    }

    #[test]
    fn float3_averages_into_scalar() {
        let v = SocketValue::Float3([1.0, 2.0, 3.0]).convert(SocketType::Float, false);
        assert_eq!(v, SocketValue::Float(2.0));
    }

    #[test]
    fn color_collapses_to_luminance() {
        let v = SocketValue::Float3([1.0, 1.0, 1.0]).convert(SocketType::Float, true);
        let f = v.as_float().unwrap();
        assert!((f - 1.0).abs() < 1e-6);
    }

    #[test]
    fn set_value_converts_to_socket_type() {
        let mut input = ShaderInput::new("Value", SocketType::Int, SocketValue::Int(0));
        input.set_value(&SocketValue::Float(3.7));
        assert_eq!(input.value, SocketValue::Int(3));
    }

    #[test]
    fn zero_and_one_checks() {
        assert!(SocketValue::Float(0.0).is_zero());
        assert!(SocketValue::Float3([0.0; 3]).is_zero());
        assert!(!SocketValue::Float3([0.0, 1.0, 0.0]).is_zero());
        assert!(SocketValue::Float3([1.0; 3]).is_one());
        assert!(!SocketValue::Closure.is_zero());
    }

    #[test]
    fn distinct_literals_hash_differently() {
        let digest = |v: SocketValue| {
            let mut h = blake3::Hasher::new();
            v.hash_into(&mut h);
            h.finalize()
        };
        assert_ne!(digest(SocketValue::Float(1.0)), digest(SocketValue::Int(1)));
        assert_ne!(digest(SocketValue::Float(1.0)), digest(SocketValue::Float(2.0)));
        assert_eq!(digest(SocketValue::Float(1.0)), digest(SocketValue::Float(1.0)));
    }
}
