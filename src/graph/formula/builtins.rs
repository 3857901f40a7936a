// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Named functions callable from formulas

use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::geometry::{shapes, text, transforms, Align, Expression};
use crate::graph::Value;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

type Body = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A function with an arity range
#[derive(Clone)]
pub struct Builtin {
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    body: Body,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn expected(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let fits = args.len() >= self.min_args && self.max_args.map_or(true, |max| args.len() <= max);
        if !fits {
            return Err(EvalError::Arity {
                function: self.name.to_string(),
                expected: self.expected(),
                got: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("args", &self.expected())
            .finish()
    }
}

/// Functions visible to every formula of a graph
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, Builtin>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` under `name`, replacing any previous definition
    pub fn register(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        body: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) {
        self.functions.insert(
            name,
            Builtin {
                name,
                min_args,
                max_args,
                body: Arc::new(body),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?
            .call(args)
    }

    /// Math and shape functions
    pub fn standard(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        register_math(&mut registry);
        register_shapes(&mut registry);
        register_transforms(&mut registry);

        let line_spacing = config.text_line_spacing;
        registry.register("text", 3, Some(5), move |a| {
            let align = match a.get(4) {
                Some(v) => v
                    .as_str()?
                    .parse::<Align>()
                    .map_err(|e| EvalError::mismatch("alignment", e.to_string()))?,
                None => Align::default(),
            };
            let height = opt_f64(a, 3, 1.0)?;
            Ok(text::text(a[0].as_str()?, f(a, 1)?, f(a, 2)?, height, align, line_spacing).into())
        });
        registry
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

// ----------------------------------------------------------------------
// Argument helpers
// ----------------------------------------------------------------------

fn f(args: &[Value], i: usize) -> Result<f64, EvalError> {
    args[i].as_f64()
}

fn opt_f64(args: &[Value], i: usize, default: f64) -> Result<f64, EvalError> {
    args.get(i).map_or(Ok(default), Value::as_f64)
}

fn shape(args: &[Value], i: usize) -> Result<&Expression, EvalError> {
    args[i].as_expression()
}

fn shapes_from(args: &[Value], start: usize) -> Result<Vec<Expression>, EvalError> {
    args[start..].iter().map(|v| v.as_expression().cloned()).collect()
}

fn count(args: &[Value], i: usize) -> Result<usize, EvalError> {
    let n = args[i].as_i64()?;
    usize::try_from(n).map_err(|_| EvalError::mismatch("non-negative Integer", n.to_string()))
}

fn float_fn(registry: &mut FunctionRegistry, name: &'static str, op: fn(f64) -> f64) {
    registry.register(name, 1, Some(1), move |a| Ok(Value::Float(op(f(a, 0)?))));
}

/// Integer when every argument is one, Float otherwise
fn fold_numbers(
    args: &[Value],
    int: fn(i64, i64) -> i64,
    float: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let ints: Option<Vec<i64>> = args
        .iter()
        .map(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        })
        .collect();
    if let Some(v) = ints.and_then(|ints| ints.into_iter().reduce(int)) {
        return Ok(Value::Integer(v));
    }
    let mut acc = f(args, 0)?;
    for v in &args[1..] {
        acc = float(acc, v.as_f64()?);
    }
    Ok(Value::Float(acc))
}

fn rounded(v: f64) -> Result<Value, EvalError> {
    if v.is_finite() {
        Ok(Value::Integer(v as i64))
    } else {
        Err(EvalError::mismatch("finite number", v.to_string()))
    }
}

// ----------------------------------------------------------------------
// Registration
// ----------------------------------------------------------------------

fn register_math(r: &mut FunctionRegistry) {
    float_fn(r, "sqrt", f64::sqrt);
    float_fn(r, "sin", f64::sin);
    float_fn(r, "cos", f64::cos);
    float_fn(r, "tan", f64::tan);
    float_fn(r, "asin", f64::asin);
    float_fn(r, "acos", f64::acos);
    float_fn(r, "atan", f64::atan);
    float_fn(r, "exp", f64::exp);
    float_fn(r, "ln", f64::ln);
    float_fn(r, "float", |v| v);

    r.register("abs", 1, Some(1), |a| match &a[0] {
        Value::Integer(i) => Ok(Value::Integer(i.wrapping_abs())),
        v => Ok(Value::Float(v.as_f64()?.abs())),
    });
    r.register("atan2", 2, Some(2), |a| Ok(Value::Float(f(a, 0)?.atan2(f(a, 1)?))));
    r.register("pow", 2, Some(2), |a| Ok(Value::Float(f(a, 0)?.powf(f(a, 1)?))));
    r.register("min", 1, None, |a| fold_numbers(a, i64::min, f64::min));
    r.register("max", 1, None, |a| fold_numbers(a, i64::max, f64::max));
    r.register("floor", 1, Some(1), |a| rounded(f(a, 0)?.floor()));
    r.register("ceil", 1, Some(1), |a| rounded(f(a, 0)?.ceil()));
    r.register("round", 1, Some(1), |a| rounded(f(a, 0)?.round()));
    r.register("int", 1, Some(1), |a| match &a[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| EvalError::mismatch("Integer", format!("'{}'", s))),
        v => rounded(v.as_f64()?.trunc()),
    });
    r.register("str", 1, Some(1), |a| Ok(Value::Text(match &a[0] {
        Value::Text(s) => s.clone(),
        v => v.to_string(),
    })));
}

fn register_shapes(r: &mut FunctionRegistry) {
    r.register("empty", 0, Some(0), |_| Ok(Expression::empty().into()));
    r.register("circle", 3, Some(3), |a| Ok(shapes::circle(f(a, 0)?, f(a, 1)?, f(a, 2)?).into()));
    r.register("rectangle", 4, Some(4), |a| {
        Ok(shapes::rectangle(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?).into())
    });
    r.register("triangle", 6, Some(6), |a| {
        Ok(shapes::triangle(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?, f(a, 5)?).into())
    });
    r.register("sphere", 4, Some(4), |a| {
        Ok(shapes::sphere(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?).into())
    });
    r.register("cube", 6, Some(6), |a| {
        Ok(shapes::cube(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?, f(a, 5)?).into())
    });
    r.register("cylinder", 5, Some(5), |a| {
        Ok(shapes::cylinder(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?).into())
    });
    r.register("cone", 5, Some(5), |a| {
        Ok(shapes::cone(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?).into())
    });
    r.register("pyramid", 6, Some(6), |a| {
        Ok(shapes::pyramid(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?, f(a, 5)?).into())
    });

    let tori: [(&'static str, fn(f64, f64, f64, f64, f64) -> Expression); 3] = [
        ("torus_x", shapes::torus_x),
        ("torus_y", shapes::torus_y),
        ("torus_z", shapes::torus_z),
    ];
    for (name, torus) in tori {
        r.register(name, 5, Some(5), move |a| {
            Ok(torus(f(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?).into())
        });
    }

    r.register("union", 1, None, |a| Ok(Expression::union_all(shapes_from(a, 0)?).into()));
    r.register("intersection", 1, None, |a| {
        Ok(Expression::intersection_all(shapes_from(a, 0)?).into())
    });
    // a - b - c is a minus the union of the rest
    r.register("difference", 2, None, |a| {
        let rest = Expression::union_all(shapes_from(a, 1)?);
        Ok(shape(a, 0)?.difference(&rest).into())
    });
}

fn register_transforms(r: &mut FunctionRegistry) {
    r.register("move", 3, Some(4), |a| {
        Ok(transforms::translate(shape(a, 0)?, f(a, 1)?, f(a, 2)?, opt_f64(a, 3, 0.0)?).into())
    });

    let rotations: [(&'static str, fn(&Expression, f64, f64, f64) -> Expression); 3] = [
        ("rotate_x", transforms::rotate_x),
        ("rotate_y", transforms::rotate_y),
        ("rotate_z", transforms::rotate_z),
    ];
    for (name, rotate) in rotations {
        r.register(name, 2, Some(4), move |a| {
            Ok(rotate(shape(a, 0)?, f(a, 1)?, opt_f64(a, 2, 0.0)?, opt_f64(a, 3, 0.0)?).into())
        });
    }

    // Shape plus an optional pivot coordinate
    let pivoted: [(&'static str, fn(&Expression, f64) -> Expression); 6] = [
        ("reflect_x", transforms::reflect_x),
        ("reflect_y", transforms::reflect_y),
        ("reflect_z", transforms::reflect_z),
        ("revolve_x", transforms::revolve_x),
        ("revolve_y", transforms::revolve_y),
        ("revolve_z", transforms::revolve_z),
    ];
    for (name, op) in pivoted {
        r.register(name, 1, Some(2), move |a| Ok(op(shape(a, 0)?, opt_f64(a, 1, 0.0)?).into()));
    }

    let swaps: [(&'static str, fn(&Expression) -> Expression); 3] = [
        ("reflect_xy", transforms::reflect_xy),
        ("reflect_xz", transforms::reflect_xz),
        ("reflect_yz", transforms::reflect_yz),
    ];
    for (name, op) in swaps {
        r.register(name, 1, Some(1), move |a| Ok(op(shape(a, 0)?).into()));
    }

    let scales: [(&'static str, fn(&Expression, f64, f64) -> Expression); 3] = [
        ("scale_x", transforms::scale_x),
        ("scale_y", transforms::scale_y),
        ("scale_z", transforms::scale_z),
    ];
    for (name, op) in scales {
        r.register(name, 3, Some(3), move |a| Ok(op(shape(a, 0)?, f(a, 1)?, f(a, 2)?).into()));
    }
    r.register("scale_xyz", 7, Some(7), |a| {
        let origin = (f(a, 1)?, f(a, 2)?, f(a, 3)?);
        let factors = (f(a, 4)?, f(a, 5)?, f(a, 6)?);
        Ok(transforms::scale_xyz(shape(a, 0)?, origin, factors).into())
    });

    r.register("shear_x_y", 5, Some(5), |a| {
        Ok(transforms::shear_x_y(shape(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?).into())
    });
    r.register("taper_x_y", 6, Some(6), |a| {
        Ok(transforms::taper_x_y(shape(a, 0)?, f(a, 1)?, f(a, 2)?, f(a, 3)?, f(a, 4)?, f(a, 5)?).into())
    });
    r.register("taper_xy_z", 7, Some(7), |a| {
        let center = (f(a, 1)?, f(a, 2)?);
        let span = (f(a, 3)?, f(a, 4)?);
        let factors = (f(a, 5)?, f(a, 6)?);
        Ok(transforms::taper_xy_z(shape(a, 0)?, center, span, factors).into())
    });
    r.register("twist_z", 6, Some(6), |a| {
        let center = (f(a, 1)?, f(a, 2)?);
        let span = (f(a, 3)?, f(a, 4)?);
        Ok(transforms::twist_z(shape(a, 0)?, center, span, f(a, 5)?).into())
    });

    r.register("extrude_z", 3, Some(3), |a| {
        Ok(transforms::extrude_z(shape(a, 0)?, f(a, 1)?, f(a, 2)?).into())
    });
    r.register("loft", 4, Some(4), |a| {
        Ok(transforms::loft(shape(a, 0)?, shape(a, 1)?, f(a, 2)?, f(a, 3)?).into())
    });
    r.register("blend", 3, Some(3), |a| {
        Ok(transforms::blend(shape(a, 0)?, shape(a, 1)?, f(a, 2)?).into())
    });
    r.register("morph", 3, Some(3), |a| {
        Ok(transforms::morph(shape(a, 0)?, shape(a, 1)?, f(a, 2)?).into())
    });

    let warps: [(&'static str, fn(&Expression, (f64, f64, f64), f64) -> Expression); 2] = [
        ("attract", transforms::attract),
        ("repel", transforms::repel),
    ];
    for (name, warp) in warps {
        r.register(name, 5, Some(5), move |a| {
            let center = (f(a, 1)?, f(a, 2)?, f(a, 3)?);
            Ok(warp(shape(a, 0)?, center, f(a, 4)?).into())
        });
    }

    r.register("offset", 2, Some(2), |a| Ok(transforms::offset(shape(a, 0)?, f(a, 1)?).into()));
    r.register("shell", 2, Some(2), |a| Ok(transforms::shell(shape(a, 0)?, f(a, 1)?).into()));
    r.register("array_2d", 5, Some(5), |a| {
        Ok(transforms::array_2d(shape(a, 0)?, count(a, 1)?, count(a, 2)?, f(a, 3)?, f(a, 4)?).into())
    });
    r.register("array_polar", 2, Some(4), |a| {
        Ok(transforms::array_polar(shape(a, 0)?, count(a, 1)?, opt_f64(a, 2, 0.0)?, opt_f64(a, 3, 0.0)?).into())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::standard(&EngineConfig::default())
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Integer(*v)).collect()
    }

    #[test]
    fn test_arity_errors() {
        let r = registry();
        let err = r.call("circle", &ints(&[1, 2])).unwrap_err();
        assert_eq!(
            err,
            EvalError::Arity {
                function: "circle".into(),
                expected: "3".into(),
                got: 2
            }
        );
        let err = r.call("move", &[]).unwrap_err();
        assert!(err.to_string().contains("3 to 4"));
        assert_eq!(r.call("nope", &[]), Err(EvalError::UnknownFunction("nope".into())));
    }

    #[test]
    fn test_math() {
        let r = registry();
        assert_eq!(r.call("min", &ints(&[3, 1, 2])), Ok(Value::Integer(1)));
        assert_eq!(
            r.call("max", &[Value::Integer(1), Value::Float(2.5)]),
            Ok(Value::Float(2.5))
        );
        assert_eq!(r.call("abs", &ints(&[-4])), Ok(Value::Integer(4)));
        assert_eq!(r.call("floor", &[Value::Float(-1.5)]), Ok(Value::Integer(-2)));
        assert_eq!(r.call("int", &[Value::Text("12".into())]), Ok(Value::Integer(12)));
        assert_eq!(r.call("str", &ints(&[7])), Ok(Value::Text("7".into())));
        let Ok(Value::Float(v)) = r.call("atan2", &ints(&[1, 1])) else {
            panic!("expected a float");
        };
        assert_relative_eq!(v, std::f64::consts::FRAC_PI_4);
    }

    #[test]
    fn test_every_listed_shape_function_is_registered() {
        let r = registry();
        for name in [
            "circle", "rectangle", "triangle", "sphere", "cube", "cylinder", "cone", "pyramid",
            "torus_x", "torus_y", "torus_z", "union", "intersection", "difference", "move",
            "rotate_x", "rotate_y", "rotate_z", "reflect_x", "reflect_y", "reflect_z",
            "reflect_xy", "reflect_xz", "reflect_yz", "scale_x", "scale_y", "scale_z",
            "scale_xyz", "shear_x_y", "taper_x_y", "taper_xy_z", "twist_z", "revolve_x",
            "revolve_y", "revolve_z", "extrude_z", "loft", "blend", "attract", "repel", "offset",
            "shell", "morph", "array_2d", "array_polar", "text", "empty",
        ] {
            assert!(r.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_shape_calls() {
        let r = registry();
        let c = r.call("circle", &ints(&[0, 0, 5])).unwrap();
        let moved = r.call("move", &[c.clone(), Value::Integer(10), Value::Integer(0)]).unwrap();
        let bounds = *moved.as_expression().unwrap().bounds();
        assert_relative_eq!(bounds.min.x, 5.0);
        assert_relative_eq!(bounds.max.x, 15.0);

        let both = r.call("union", &[c, moved]).unwrap();
        assert_relative_eq!(both.as_expression().unwrap().bounds().min.x, -5.0);

        let err = r.call("array_2d", &[both, Value::Integer(-1), Value::Integer(1), Value::Float(1.0), Value::Float(1.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_variadic_booleans() {
        let r = registry();
        let circles: Vec<Value> = (0..2000)
            .map(|i| r.call("circle", &ints(&[i * 3, 0, 1])).unwrap())
            .collect();

        let all = r.call("union", &circles).unwrap();
        let all = all.as_expression().unwrap();
        assert!(all.formula().depth() < 32);
        assert_relative_eq!(all.bounds().max.x, 5998.0);
        assert!(all.contains(&nalgebra::Point3::new(3000.0, 0.0, 0.0)));

        let cut = r.call("difference", &circles[..3]).unwrap();
        let cut = cut.as_expression().unwrap();
        assert!(cut.contains(&nalgebra::Point3::new(0.0, 0.0, 0.0)));
        assert_relative_eq!(cut.bounds().max.x, 1.0);

        let lens = r
            .call("intersection", &[circles[0].clone(), r.call("circle", &ints(&[1, 0, 1])).unwrap()])
            .unwrap();
        assert!(lens.as_expression().unwrap().contains(&nalgebra::Point3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_text_alignment_argument() {
        let r = registry();
        let args = [Value::Text("HI".into()), Value::Integer(0), Value::Integer(0)];
        assert!(r.call("text", &args).is_ok());

        let mut bad = args.to_vec();
        bad.extend([Value::Integer(1), Value::Text("QQ".into())]);
        assert!(r.call("text", &bad).is_err());
    }
}
