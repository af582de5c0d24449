//! Constant folding helpers.
//!
//! A [`ConstantFolder`] is bound to one node and one of its outputs. Node
//! fold rules use it to replace the output with a literal (pushed into every
//! consumer), redirect consumers to another output, or drop a closure
//! output entirely.

use crate::error::CoreError;
use crate::graph::ShaderGraph;
use crate::id::{InputRef, NodeId, OutputRef};
use crate::math::{saturate, saturate3, MathType, MixType, VectorMathType};
use crate::node::ShaderNode;
use crate::socket::{SocketType, SocketValue};

/// Folding context for one `(node, output)` pair.
pub struct ConstantFolder<'g> {
    pub graph: &'g mut ShaderGraph,
    pub node: NodeId,
    pub output: OutputRef,
}

impl<'g> ConstantFolder<'g> {
    pub fn new(graph: &'g mut ShaderGraph, output: OutputRef) -> Self {
        ConstantFolder {
            graph,
            node: output.node,
            output,
        }
    }

    pub fn node(&self) -> Result<&ShaderNode, CoreError> {
        self.graph.node(self.node)
    }

    fn output_type(&self) -> Result<SocketType, CoreError> {
        Ok(self.graph.output_socket(self.output)?.ty)
    }

    /// Name of the output being folded.
    pub fn output_name(&self) -> Result<&str, CoreError> {
        Ok(self.graph.output_socket(self.output)?.name.as_str())
    }

    fn input(&self, name: &str) -> Result<InputRef, CoreError> {
        self.graph.input_ref(self.node, name)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// True when no input of the node is linked.
    pub fn all_inputs_constant(&self) -> Result<bool, CoreError> {
        Ok(!self.node()?.has_linked_inputs())
    }

    /// True when the named input is unlinked and its literal is zero.
    pub fn is_zero(&self, name: &str) -> Result<bool, CoreError> {
        let input = self.graph.input(self.input(name)?)?;
        Ok(input.link().is_none()
            && (input.ty == SocketType::Float || input.ty.is_float3())
            && input.value.is_zero())
    }

    /// True when the named input is unlinked and its literal is one.
    pub fn is_one(&self, name: &str) -> Result<bool, CoreError> {
        let input = self.graph.input(self.input(name)?)?;
        Ok(input.link().is_none()
            && (input.ty == SocketType::Float || input.ty.is_float3())
            && input.value.is_one())
    }

    // -----------------------------------------------------------------------
    // Rewrites
    // -----------------------------------------------------------------------

    /// Pushes `value` into every consumer and disconnects the output.
    pub fn make_constant(&mut self, value: SocketValue) -> Result<(), CoreError> {
        tracing::trace!(node = %self.node, ?value, "folded to constant");
        let consumers: Vec<InputRef> = self.graph.links_of(self.output)?.to_vec();
        for input in consumers {
            self.graph.set_value(input, &value)?;
        }
        self.graph.disconnect_output(self.output)
    }

    /// Like [`make_constant`](Self::make_constant), saturating when `clamp`.
    pub fn make_constant_clamp(&mut self, value: SocketValue, clamp: bool) -> Result<(), CoreError> {
        let value = match (clamp, value) {
            (true, SocketValue::Float(f)) => SocketValue::Float(saturate(f)),
            (true, SocketValue::Float3(c)) => SocketValue::Float3(saturate3(c)),
            (_, value) => value,
        };
        self.make_constant(value)
    }

    pub fn make_zero(&mut self) -> Result<(), CoreError> {
        let ty = self.output_type()?;
        if ty == SocketType::Float || ty.is_float3() {
            self.make_constant(ty.zero())
        } else {
            Ok(())
        }
    }

    pub fn make_one(&mut self) -> Result<(), CoreError> {
        match self.output_type()? {
            SocketType::Float => self.make_constant(SocketValue::Float(1.0)),
            ty if ty.is_float3() => self.make_constant(SocketValue::Float3([1.0; 3])),
            _ => Ok(()),
        }
    }

    /// Redirects every consumer of the folded output to `new_output`.
    pub fn bypass(&mut self, new_output: OutputRef) -> Result<(), CoreError> {
        tracing::trace!(node = %self.node, to = %new_output, "bypassed");
        let consumers: Vec<InputRef> = self.graph.links_of(self.output)?.to_vec();
        self.graph.disconnect_output(self.output)?;
        for input in consumers {
            self.graph.connect(new_output, input)?;
        }
        Ok(())
    }

    /// Drops a closure output: its consumers become unlinked.
    pub fn discard(&mut self) -> Result<(), CoreError> {
        debug_assert_eq!(self.output_type()?, SocketType::Closure);
        self.graph.disconnect_output(self.output)
    }

    /// Bypasses to the named closure input's upstream, or discards when it is
    /// unlinked.
    pub fn bypass_or_discard(&mut self, name: &str) -> Result<(), CoreError> {
        match self.graph.link_of(self.input(name)?)? {
            Some(upstream) => self.bypass(upstream),
            None => self.discard(),
        }
    }

    /// Replaces the output with the named input: its upstream when linked,
    /// its literal otherwise.
    ///
    /// Only applies when the input and output types match. With `clamp` a
    /// linked input cannot be bypassed; the node's other inputs are
    /// disconnected instead and `false` is returned.
    pub fn try_bypass_or_make_constant(&mut self, name: &str, clamp: bool) -> Result<bool, CoreError> {
        let input_ref = self.input(name)?;
        let (ty, link, value) = {
            let input = self.graph.input(input_ref)?;
            (input.ty, input.link(), input.value.clone())
        };

        if ty != self.output_type()? {
            return Ok(false);
        }

        match link {
            None if ty == SocketType::Float || ty.is_float3() => {
                self.make_constant_clamp(value, clamp)?;
                Ok(true)
            }
            None => Ok(false),
            Some(upstream) if !clamp => {
                self.bypass(upstream)?;
                Ok(true)
            }
            Some(_) => {
                let inputs = self.node()?.inputs().len();
                for slot in 0..inputs {
                    let other = InputRef::new(self.node, slot);
                    if other != input_ref && self.graph.input(other)?.is_linked() {
                        self.graph.disconnect_input(other)?;
                    }
                }
                Ok(false)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Partial folds for arithmetic nodes
    // -----------------------------------------------------------------------

    /// Algebraic identities for scalar math with some linked inputs.
    pub fn fold_math(&mut self, ty: MathType) -> Result<(), CoreError> {
        match ty {
            MathType::Add => {
                if self.is_zero("Value1")? {
                    self.try_bypass_or_make_constant("Value2", false)?;
                } else if self.is_zero("Value2")? {
                    self.try_bypass_or_make_constant("Value1", false)?;
                }
            }
            MathType::Subtract => {
                if self.is_zero("Value2")? {
                    self.try_bypass_or_make_constant("Value1", false)?;
                }
            }
            MathType::Multiply => {
                if self.is_one("Value1")? {
                    self.try_bypass_or_make_constant("Value2", false)?;
                } else if self.is_one("Value2")? {
                    self.try_bypass_or_make_constant("Value1", false)?;
                } else if self.is_zero("Value1")? || self.is_zero("Value2")? {
                    self.make_zero()?;
                }
            }
            MathType::Divide => {
                if self.is_one("Value2")? {
                    self.try_bypass_or_make_constant("Value1", false)?;
                } else if self.is_zero("Value1")? {
                    self.make_zero()?;
                }
            }
            MathType::Power => {
                if self.is_one("Value1")? || self.is_zero("Value2")? {
                    self.make_one()?;
                } else if self.is_one("Value2")? {
                    self.try_bypass_or_make_constant("Value1", false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Algebraic identities for vector math with some linked inputs.
    pub fn fold_vector_math(&mut self, ty: VectorMathType) -> Result<(), CoreError> {
        match ty {
            VectorMathType::Add => {
                if self.is_zero("Vector1")? {
                    self.try_bypass_or_make_constant("Vector2", false)?;
                } else if self.is_zero("Vector2")? {
                    self.try_bypass_or_make_constant("Vector1", false)?;
                }
            }
            VectorMathType::Subtract => {
                if self.is_zero("Vector2")? {
                    self.try_bypass_or_make_constant("Vector1", false)?;
                }
            }
            VectorMathType::Multiply => {
                if self.is_zero("Vector1")? || self.is_zero("Vector2")? {
                    self.make_zero()?;
                } else if self.is_one("Vector1")? {
                    self.try_bypass_or_make_constant("Vector2", false)?;
                } else if self.is_one("Vector2")? {
                    self.try_bypass_or_make_constant("Vector1", false)?;
                }
            }
            VectorMathType::Divide => {
                if self.is_zero("Vector1")? {
                    self.make_zero()?;
                } else if self.is_one("Vector2")? {
                    self.try_bypass_or_make_constant("Vector1", false)?;
                }
            }
            VectorMathType::DotProduct | VectorMathType::CrossProduct => {
                if self.is_zero("Vector1")? || self.is_zero("Vector2")? {
                    self.make_zero()?;
                }
            }
            VectorMathType::Length | VectorMathType::Absolute => {
                if self.is_zero("Vector1")? {
                    self.make_zero()?;
                }
            }
            VectorMathType::Scale => {
                if self.is_zero("Vector1")? || self.is_zero("Scale")? {
                    self.make_zero()?;
                } else if self.is_one("Scale")? {
                    self.try_bypass_or_make_constant("Vector1", false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Identities for colour mixing with some linked inputs.
    pub fn fold_mix(&mut self, ty: MixType, clamp: bool) -> Result<(), CoreError> {
        let (fac_linked, fac, c1_link, c2_link, c1, c2) = {
            let node = self.node()?;
            (
                node.is_linked("Fac"),
                saturate(node.float("Fac")),
                node.input("Color1").and_then(|i| i.link()),
                node.input("Color2").and_then(|i| i.link()),
                node.float3("Color1"),
                node.float3("Color2"),
            )
        };
        let fac_is_zero = !fac_linked && fac == 0.0;
        let fac_is_one = !fac_linked && fac == 1.0;

        if fac_is_zero && self.try_bypass_or_make_constant("Color1", clamp)? {
            return Ok(());
        }

        match ty {
            MixType::Blend => {
                let same_link = c1_link.is_some() && c1_link == c2_link;
                let same_literal = c1_link.is_none() && c2_link.is_none() && c1 == c2;
                if same_link || same_literal {
                    self.try_bypass_or_make_constant("Color1", clamp)?;
                } else if fac_is_one {
                    self.try_bypass_or_make_constant("Color2", clamp)?;
                }
            }
            MixType::Add => {
                if self.is_zero("Color1")? && fac_is_one {
                    self.try_bypass_or_make_constant("Color2", clamp)?;
                } else if self.is_zero("Color2")? {
                    self.try_bypass_or_make_constant("Color1", clamp)?;
                }
            }
            MixType::Subtract => {
                if self.is_zero("Color2")? {
                    self.try_bypass_or_make_constant("Color1", clamp)?;
                } else if c1_link.is_some() && c1_link == c2_link && fac_is_one {
                    self.make_zero()?;
                }
            }
            MixType::Multiply => {
                if self.is_one("Color1")? && fac_is_one {
                    self.try_bypass_or_make_constant("Color2", clamp)?;
                } else if self.is_one("Color2")? {
                    self.try_bypass_or_make_constant("Color1", clamp)?;
                } else if self.is_zero("Color1")? || (self.is_zero("Color2")? && fac_is_one) {
                    self.make_zero()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::NodeKind;

    fn add_math(graph: &mut ShaderGraph, math_type: MathType) -> NodeId {
        graph.add_node(NodeKind::Math {
            math_type,
            use_clamp: false,
        })
    }

    #[test]
    fn make_constant_pushes_value_into_consumers() {
        let mut graph = ShaderGraph::new();
        let a = add_math(&mut graph, MathType::Add);
        let b = add_math(&mut graph, MathType::Add);
        graph.connect_by_name(a, "Value", b, "Value1").unwrap();

        let out = graph.output_ref(a, "Value").unwrap();
        ConstantFolder::new(&mut graph, out)
            .make_constant(SocketValue::Float(9.0))
            .unwrap();

        let node = graph.node(b).unwrap();
        assert!(!node.is_linked("Value1"));
        assert_eq!(node.float("Value1"), 9.0);
    }

    #[test]
    fn make_constant_clamp_saturates() {
        let mut graph = ShaderGraph::new();
        let a = add_math(&mut graph, MathType::Add);
        let b = add_math(&mut graph, MathType::Add);
        graph.connect_by_name(a, "Value", b, "Value2").unwrap();
        let out = graph.output_ref(a, "Value").unwrap();
        ConstantFolder::new(&mut graph, out)
            .make_constant_clamp(SocketValue::Float(4.0), true)
            .unwrap();
        assert_eq!(graph.node(b).unwrap().float("Value2"), 1.0);
    }

    #[test]
    fn multiply_by_one_bypasses_to_other_operand() {
        let mut graph = ShaderGraph::new();
        let src = add_math(&mut graph, MathType::Add);
        let mul = add_math(&mut graph, MathType::Multiply);
        let dst = add_math(&mut graph, MathType::Add);
        graph.connect_by_name(src, "Value", mul, "Value1").unwrap();
        graph.connect_by_name(mul, "Value", dst, "Value1").unwrap();
        graph
            .node_mut(mul)
            .unwrap()
            .set_input_value("Value2", SocketValue::Float(1.0));

        let out = graph.output_ref(mul, "Value").unwrap();
        ConstantFolder::new(&mut graph, out)
            .fold_math(MathType::Multiply)
            .unwrap();

        let input = graph.input_ref(dst, "Value1").unwrap();
        assert_eq!(graph.link_of(input).unwrap().map(|o| o.node), Some(src));
    }

    #[test]
    fn multiply_by_zero_makes_zero() {
        let mut graph = ShaderGraph::new();
        let src = add_math(&mut graph, MathType::Add);
        let mul = add_math(&mut graph, MathType::Multiply);
        let dst = add_math(&mut graph, MathType::Add);
        graph.connect_by_name(src, "Value", mul, "Value1").unwrap();
        graph.connect_by_name(mul, "Value", dst, "Value2").unwrap();
        graph
            .node_mut(mul)
            .unwrap()
            .set_input_value("Value2", SocketValue::Float(0.0));

        let out = graph.output_ref(mul, "Value").unwrap();
        ConstantFolder::new(&mut graph, out)
            .fold_math(MathType::Multiply)
            .unwrap();

        let node = graph.node(dst).unwrap();
        assert!(!node.is_linked("Value2"));
        assert_eq!(node.float("Value2"), 0.0);
    }

    #[test]
    fn bypass_or_discard_drops_unlinked_closure() {
        let mut graph = ShaderGraph::new();
        let add = graph.add_node(NodeKind::AddClosure);
        graph
            .connect_by_name(add, "Closure", NodeId::OUTPUT, "Surface")
            .unwrap();
        let out = graph.output_ref(add, "Closure").unwrap();
        ConstantFolder::new(&mut graph, out)
            .bypass_or_discard("Closure1")
            .unwrap();
        assert!(!graph.output().is_linked("Surface"));
    }

    #[test]
    fn try_bypass_with_clamp_keeps_node_but_drops_other_inputs() {
        let mut graph = ShaderGraph::new();
        let a = graph.add_node(NodeKind::Color);
        let b = graph.add_node(NodeKind::Color);
        let mix = graph.add_node(NodeKind::Mix {
            mix_type: MixType::Blend,
            use_clamp: true,
        });
        graph.connect_by_name(a, "Color", mix, "Color1").unwrap();
        graph.connect_by_name(b, "Color", mix, "Fac").unwrap();

        let out = graph.output_ref(mix, "Color").unwrap();
        let bypassed = ConstantFolder::new(&mut graph, out)
            .try_bypass_or_make_constant("Color1", true)
            .unwrap();

        assert!(!bypassed);
        let node = graph.node(mix).unwrap();
        assert!(node.is_linked("Color1"));
        assert!(!node.is_linked("Fac"));
    }
}
