// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Built-in node kinds

use super::script::{run_script, OUTPUTS_DATUM, SCRIPT_DATUM};
use super::DatumType::{Expression as Shape, Float, Text as Str};
use super::{Combiner, DatumSpec, DatumType, Graph, NodeId, Value};
use crate::error::{EvalError, GraphError};
use crate::geometry::{shapes, text, transforms, Align, Expression};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Datum holding a node's computed shape
pub const SHAPE_DATUM: &str = "shape";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Point3d,
    Circle,
    Rectangle,
    Sphere,
    Cube,
    Union,
    Intersection,
    Difference,
    Move,
    RotateZ,
    Scale,
    ExtrudeZ,
    RevolveY,
    Blend,
    Text,
    Script,
}

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Point3d,
        NodeKind::Circle,
        NodeKind::Rectangle,
        NodeKind::Sphere,
        NodeKind::Cube,
        NodeKind::Union,
        NodeKind::Intersection,
        NodeKind::Difference,
        NodeKind::Move,
        NodeKind::RotateZ,
        NodeKind::Scale,
        NodeKind::ExtrudeZ,
        NodeKind::RevolveY,
        NodeKind::Blend,
        NodeKind::Text,
        NodeKind::Script,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Point3d => "Point3d",
            NodeKind::Circle => "Circle",
            NodeKind::Rectangle => "Rectangle",
            NodeKind::Sphere => "Sphere",
            NodeKind::Cube => "Cube",
            NodeKind::Union => "Union",
            NodeKind::Intersection => "Intersection",
            NodeKind::Difference => "Difference",
            NodeKind::Move => "Move",
            NodeKind::RotateZ => "RotateZ",
            NodeKind::Scale => "Scale",
            NodeKind::ExtrudeZ => "ExtrudeZ",
            NodeKind::RevolveY => "RevolveY",
            NodeKind::Blend => "Blend",
            NodeKind::Text => "Text",
            NodeKind::Script => "Script",
        }
    }

    /// Name prefix used when none is given
    pub fn default_prefix(self) -> &'static str {
        match self {
            NodeKind::Point3d => "p",
            NodeKind::Circle => "c",
            NodeKind::Rectangle => "rect",
            NodeKind::Sphere => "s",
            NodeKind::Cube => "cube",
            NodeKind::Union => "u",
            NodeKind::Intersection => "i",
            NodeKind::Difference => "diff",
            NodeKind::Move => "move",
            NodeKind::RotateZ => "rot",
            NodeKind::Scale => "scale",
            NodeKind::ExtrudeZ => "ext",
            NodeKind::RevolveY => "rev",
            NodeKind::Blend => "blend",
            NodeKind::Text => "txt",
            NodeKind::Script => "script",
        }
    }

    /// Connectable parameters: name, type and initial formula
    fn parameters(self) -> &'static [(&'static str, DatumType, &'static str)] {
        match self {
            NodeKind::Point3d => &[("x", Float, "0.0"), ("y", Float, "0.0"), ("z", Float, "0.0")],
            NodeKind::Circle => &[("x", Float, "0.0"), ("y", Float, "0.0"), ("r", Float, "1.0")],
            NodeKind::Rectangle => &[
                ("xmin", Float, "-1.0"),
                ("xmax", Float, "1.0"),
                ("ymin", Float, "-1.0"),
                ("ymax", Float, "1.0"),
            ],
            NodeKind::Sphere => &[
                ("x", Float, "0.0"),
                ("y", Float, "0.0"),
                ("z", Float, "0.0"),
                ("r", Float, "1.0"),
            ],
            NodeKind::Cube => &[
                ("xmin", Float, "-1.0"),
                ("xmax", Float, "1.0"),
                ("ymin", Float, "-1.0"),
                ("ymax", Float, "1.0"),
                ("zmin", Float, "-1.0"),
                ("zmax", Float, "1.0"),
            ],
            NodeKind::Union | NodeKind::Intersection => &[],
            NodeKind::Difference => &[("a", Shape, "empty()"), ("b", Shape, "empty()")],
            NodeKind::Move => &[
                ("input", Shape, "empty()"),
                ("dx", Float, "0.0"),
                ("dy", Float, "0.0"),
                ("dz", Float, "0.0"),
            ],
            NodeKind::RotateZ => &[
                ("input", Shape, "empty()"),
                ("angle", Float, "0.0"),
                ("x0", Float, "0.0"),
                ("y0", Float, "0.0"),
            ],
            NodeKind::Scale => &[
                ("input", Shape, "empty()"),
                ("sx", Float, "1.0"),
                ("sy", Float, "1.0"),
                ("sz", Float, "1.0"),
            ],
            NodeKind::ExtrudeZ => &[
                ("input", Shape, "empty()"),
                ("zmin", Float, "0.0"),
                ("zmax", Float, "1.0"),
            ],
            NodeKind::RevolveY => &[("input", Shape, "empty()"), ("x0", Float, "0.0")],
            NodeKind::Blend => &[
                ("a", Shape, "empty()"),
                ("b", Shape, "empty()"),
                ("amount", Float, "0.1"),
            ],
            NodeKind::Text => &[
                ("text", Str, "text"),
                ("x", Float, "0.0"),
                ("y", Float, "0.0"),
                ("height", Float, "1.0"),
                ("align", Str, "LB"),
            ],
            NodeKind::Script => &[(SCRIPT_DATUM, Str, "")],
        }
    }

    /// The node's computed datum, if it has one
    fn output(self) -> Option<DatumSpec> {
        match self {
            NodeKind::Point3d => None,
            NodeKind::Script => Some(DatumSpec::function(
                OUTPUTS_DATUM,
                DatumType::StructuredOutputs,
                |g, n| {
                    let source = g.read_text(n, SCRIPT_DATUM)?;
                    run_script(g, &source).map(Value::Outputs)
                },
            )),
            kind => Some(DatumSpec::function(SHAPE_DATUM, Shape, move |g, n| {
                kind.shape(g, n).map(Value::Expression)
            })),
        }
    }

    fn shape(self, g: &mut Graph, n: NodeId) -> Result<Expression, EvalError> {
        let e = match self {
            NodeKind::Circle => shapes::circle(g.read_f64(n, "x")?, g.read_f64(n, "y")?, g.read_f64(n, "r")?),
            NodeKind::Rectangle => shapes::rectangle(
                g.read_f64(n, "xmin")?,
                g.read_f64(n, "xmax")?,
                g.read_f64(n, "ymin")?,
                g.read_f64(n, "ymax")?,
            ),
            NodeKind::Sphere => shapes::sphere(
                g.read_f64(n, "x")?,
                g.read_f64(n, "y")?,
                g.read_f64(n, "z")?,
                g.read_f64(n, "r")?,
            ),
            NodeKind::Cube => shapes::cube(
                g.read_f64(n, "xmin")?,
                g.read_f64(n, "xmax")?,
                g.read_f64(n, "ymin")?,
                g.read_f64(n, "ymax")?,
                g.read_f64(n, "zmin")?,
                g.read_f64(n, "zmax")?,
            ),
            NodeKind::Union | NodeKind::Intersection => g.read_expression(n, "shapes")?,
            NodeKind::Difference => {
                let a = g.read_expression(n, "a")?;
                a.difference(&g.read_expression(n, "b")?)
            }
            NodeKind::Move => transforms::translate(
                &g.read_expression(n, "input")?,
                g.read_f64(n, "dx")?,
                g.read_f64(n, "dy")?,
                g.read_f64(n, "dz")?,
            ),
            NodeKind::RotateZ => transforms::rotate_z(
                &g.read_expression(n, "input")?,
                g.read_f64(n, "angle")?,
                g.read_f64(n, "x0")?,
                g.read_f64(n, "y0")?,
            ),
            NodeKind::Scale => transforms::scale_xyz(
                &g.read_expression(n, "input")?,
                (0.0, 0.0, 0.0),
                (g.read_f64(n, "sx")?, g.read_f64(n, "sy")?, g.read_f64(n, "sz")?),
            ),
            NodeKind::ExtrudeZ => transforms::extrude_z(
                &g.read_expression(n, "input")?,
                g.read_f64(n, "zmin")?,
                g.read_f64(n, "zmax")?,
            ),
            NodeKind::RevolveY => {
                transforms::revolve_y(&g.read_expression(n, "input")?, g.read_f64(n, "x0")?)
            }
            NodeKind::Blend => {
                let a = g.read_expression(n, "a")?;
                let b = g.read_expression(n, "b")?;
                transforms::blend(&a, &b, g.read_f64(n, "amount")?)
            }
            NodeKind::Text => {
                let align = g
                    .read_text(n, "align")?
                    .parse::<Align>()
                    .map_err(|e| EvalError::mismatch("alignment", e.to_string()))?;
                let spacing = g.config().text_line_spacing;
                text::text(
                    &g.read_text(n, "text")?,
                    g.read_f64(n, "x")?,
                    g.read_f64(n, "y")?,
                    g.read_f64(n, "height")?,
                    align,
                    spacing,
                )
            }
            NodeKind::Point3d | NodeKind::Script => {
                return Err(EvalError::mismatch("shape node", self.label()))
            }
        };
        Ok(e)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}

impl Graph {
    /// Instantiate a built-in node named `prefix` plus the first free suffix.
    ///
    /// An empty prefix uses the kind's default.
    pub fn create(&mut self, kind: NodeKind, prefix: &str) -> Result<NodeId, GraphError> {
        let prefix = if prefix.is_empty() { kind.default_prefix() } else { prefix };
        let name = self.unique_name(prefix);
        let node = self.add_node(kind.label(), &name)?;

        for &(datum, ty, formula) in kind.parameters() {
            self.add_datum(node, DatumSpec::formula(datum, ty, formula).single_input())?;
        }
        match kind {
            NodeKind::Union => {
                let spec = DatumSpec::formula("shapes", Shape, "empty()");
                self.add_datum(node, spec.multi_input(Combiner::union()))?;
            }
            NodeKind::Intersection => {
                let spec = DatumSpec::formula("shapes", Shape, "empty()");
                self.add_datum(node, spec.multi_input(Combiner::intersection()))?;
            }
            _ => {}
        }
        if let Some(output) = kind.output() {
            self.add_datum(node, output)?;
        }

        debug!(node = %node, kind = %kind, name = %name, "Library node created");
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_names_follow_prefix() {
        let mut g = Graph::new();
        let c0 = g.create(NodeKind::Circle, "").unwrap();
        let c1 = g.create(NodeKind::Circle, "").unwrap();
        assert_eq!(g.node_name(c0), Some("c0"));
        assert_eq!(g.node_name(c1), Some("c1"));
        assert_eq!(g.node(c1).unwrap().kind(), "Circle");
    }

    #[test]
    fn test_circle_shape_tracks_parameters() {
        let mut g = Graph::new();
        let c = g.create(NodeKind::Circle, "c").unwrap();
        let r = g.get_datum(c, "r").unwrap();
        g.set_formula(r, "5").unwrap();

        let shape = g.read_expression(c, SHAPE_DATUM).unwrap();
        assert_relative_eq!(shape.bounds().max.x, 5.0);

        g.set_formula(r, "2.5").unwrap();
        let shape = g.read_expression(c, SHAPE_DATUM).unwrap();
        assert_relative_eq!(shape.bounds().max.x, 2.5);
    }

    #[test]
    fn test_union_node_combines_connections() {
        let mut g = Graph::new();
        let a = g.create(NodeKind::Circle, "a").unwrap();
        let b = g.create(NodeKind::Circle, "b").unwrap();
        let bx = g.get_datum(b, "x").unwrap();
        g.set_formula(bx, "10").unwrap();
        let u = g.create(NodeKind::Union, "").unwrap();
        let shapes = g.get_datum(u, "shapes").unwrap();

        let a_shape = g.get_datum(a, SHAPE_DATUM).unwrap();
        let b_shape = g.get_datum(b, SHAPE_DATUM).unwrap();
        assert!(g.connect(a_shape, shapes).is_some());
        assert!(g.connect(b_shape, shapes).is_some());
        assert!(g.connect(a_shape, shapes).is_none());

        let shape = g.read_expression(u, SHAPE_DATUM).unwrap();
        assert_relative_eq!(shape.bounds().min.x, -1.0);
        assert_relative_eq!(shape.bounds().max.x, 11.0);
    }

    #[test]
    fn test_script_node_outputs() {
        let mut g = Graph::new();
        let s = g.create(NodeKind::Script, "").unwrap();
        let script = g.get_datum(s, SCRIPT_DATUM).unwrap();
        g.set_formula(script, "r = 3\nshape = circle(0, 0, r)").unwrap();

        let p = g.create(NodeKind::Point3d, "").unwrap();
        let px = g.get_datum(p, "x").unwrap();
        g.set_formula(px, "script0.outputs.r * 2").unwrap();
        assert_eq!(g.value(px), Ok(Value::Float(6.0)));

        g.set_formula(script, "r = 4").unwrap();
        assert_eq!(g.value(px), Ok(Value::Float(8.0)));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.label().parse::<NodeKind>(), Ok(kind));
        }
        assert!("Teapot".parse::<NodeKind>().is_err());
    }
}
