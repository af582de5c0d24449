//! Literal evaluation for the arithmetic node kinds.
//!
//! These mirror the kernel's scalar, vector and colour-mix operations so the
//! constant folder can replace fully-literal nodes with their result.

use serde::{Deserialize, Serialize};

/// Scalar math operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathType {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    MultiplyAdd,
    Power,
    Minimum,
    Maximum,
    Absolute,
    Sine,
    Cosine,
}

/// Vector math operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorMathType {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    MultiplyAdd,
    CrossProduct,
    DotProduct,
    Distance,
    Length,
    Scale,
    Normalize,
    Absolute,
}

/// Colour mix blend modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixType {
    #[default]
    Blend,
    Add,
    Multiply,
    Subtract,
    Screen,
    Difference,
    Darken,
    Lighten,
}

/// Clamp node modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampType {
    #[default]
    MinMax,
    /// Like `MinMax`, but swaps the bounds when `min > max`.
    Range,
}

pub type Float3 = [f32; 3];

fn safe_divide(a: f32, b: f32) -> f32 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

fn safe_powf(a: f32, b: f32) -> f32 {
    if a < 0.0 && b != b.trunc() {
        0.0
    } else {
        a.powf(b)
    }
}

pub fn saturate(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

pub fn saturate3(v: Float3) -> Float3 {
    v.map(saturate)
}

fn zip3(a: Float3, b: Float3, f: impl Fn(f32, f32) -> f32) -> Float3 {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2])]
}

fn dot(a: Float3, b: Float3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: Float3) -> f32 {
    dot(a, a).sqrt()
}

fn lerp3(a: Float3, b: Float3, t: f32) -> Float3 {
    zip3(a, b, |x, y| x + (y - x) * t)
}

/// Evaluates a scalar math node.
pub fn eval_math(ty: MathType, a: f32, b: f32, c: f32) -> f32 {
    match ty {
        MathType::Add => a + b,
        MathType::Subtract => a - b,
        MathType::Multiply => a * b,
        MathType::Divide => safe_divide(a, b),
        MathType::MultiplyAdd => a * b + c,
        MathType::Power => safe_powf(a, b),
        MathType::Minimum => a.min(b),
        MathType::Maximum => a.max(b),
        MathType::Absolute => a.abs(),
        MathType::Sine => a.sin(),
        MathType::Cosine => a.cos(),
    }
}

/// Evaluates a vector math node, returning `(Value, Vector)`.
pub fn eval_vector_math(
    ty: VectorMathType,
    a: Float3,
    b: Float3,
    c: Float3,
    scale: f32,
) -> (f32, Float3) {
    let zero = [0.0; 3];
    match ty {
        VectorMathType::Add => (0.0, zip3(a, b, |x, y| x + y)),
        VectorMathType::Subtract => (0.0, zip3(a, b, |x, y| x - y)),
        VectorMathType::Multiply => (0.0, zip3(a, b, |x, y| x * y)),
        VectorMathType::Divide => (0.0, zip3(a, b, safe_divide)),
        VectorMathType::MultiplyAdd => {
            let ab = zip3(a, b, |x, y| x * y);
            (0.0, zip3(ab, c, |x, y| x + y))
        }
        VectorMathType::CrossProduct => (
            0.0,
            [
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ],
        ),
        VectorMathType::DotProduct => (dot(a, b), zero),
        VectorMathType::Distance => (length(zip3(a, b, |x, y| x - y)), zero),
        VectorMathType::Length => (length(a), zero),
        VectorMathType::Scale => (0.0, a.map(|x| x * scale)),
        VectorMathType::Normalize => {
            let len = length(a);
            if len != 0.0 {
                (0.0, a.map(|x| x / len))
            } else {
                (0.0, zero)
            }
        }
        VectorMathType::Absolute => (0.0, a.map(f32::abs)),
    }
}

/// Evaluates a colour mix with the factor clamped to `[0, 1]`.
pub fn eval_mix(ty: MixType, fac: f32, c1: Float3, c2: Float3) -> Float3 {
    let t = saturate(fac);
    match ty {
        MixType::Blend => lerp3(c1, c2, t),
        MixType::Add => zip3(c1, c2, |x, y| x + t * y),
        MixType::Multiply => zip3(c1, c2, |x, y| x * (1.0 - t + t * y)),
        MixType::Subtract => zip3(c1, c2, |x, y| x - t * y),
        MixType::Screen => zip3(c1, c2, |x, y| {
            1.0 - (1.0 - t + t * (1.0 - y)) * (1.0 - x)
        }),
        MixType::Difference => lerp3(c1, zip3(c1, c2, |x, y| (x - y).abs()), t),
        MixType::Darken => lerp3(c1, zip3(c1, c2, f32::min), t),
        MixType::Lighten => lerp3(c1, zip3(c1, c2, f32::max), t),
    }
}

/// Evaluates a clamp node.
pub fn eval_clamp(ty: ClampType, value: f32, min: f32, max: f32) -> f32 {
    if ty == ClampType::Range && min > max {
        value.max(max).min(min)
    } else {
        value.max(min).min(max)
    }
}
