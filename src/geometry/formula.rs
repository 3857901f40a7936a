// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Symbolic implicit-function trees over X, Y and Z
//!
//! A formula is negative inside a shape and positive outside. Trees share
//! subtrees through `Arc`, so cloning is cheap and values can be handed to
//! worker threads unchanged.
//!
//! The textual form is prefix notation, one token per operator separated by
//! spaces:
//!
//! ```text
//! X Y Z        variables
//! f1.5         constant
//! + - * / p A  add, sub, mul, div, pow, atan2
//! i a          min, max
//! n q b r      negate, sqrt, abs, square
//! s c t        sin, cos, tan
//! S C T        asin, acos, atan
//! x l          exp, ln
//! m <x> <y> <z> <f>   evaluate f at remapped coordinates ('_' keeps an axis)
//! ```

use super::Interval;
use std::fmt;
use std::iter::Peekable;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::SplitWhitespace;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Sqrt,
    Abs,
    Square,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Ln,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Pow,
    Atan2,
}

impl UnaryOp {
    pub fn token(self) -> char {
        match self {
            UnaryOp::Neg => 'n',
            UnaryOp::Sqrt => 'q',
            UnaryOp::Abs => 'b',
            UnaryOp::Square => 'r',
            UnaryOp::Sin => 's',
            UnaryOp::Cos => 'c',
            UnaryOp::Tan => 't',
            UnaryOp::Asin => 'S',
            UnaryOp::Acos => 'C',
            UnaryOp::Atan => 'T',
            UnaryOp::Exp => 'x',
            UnaryOp::Ln => 'l',
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "n" => UnaryOp::Neg,
            "q" => UnaryOp::Sqrt,
            "b" => UnaryOp::Abs,
            "r" => UnaryOp::Square,
            "s" => UnaryOp::Sin,
            "c" => UnaryOp::Cos,
            "t" => UnaryOp::Tan,
            "S" => UnaryOp::Asin,
            "C" => UnaryOp::Acos,
            "T" => UnaryOp::Atan,
            "x" => UnaryOp::Exp,
            "l" => UnaryOp::Ln,
            _ => return None,
        })
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            UnaryOp::Neg => -v,
            UnaryOp::Sqrt => v.sqrt(),
            UnaryOp::Abs => v.abs(),
            UnaryOp::Square => v * v,
            UnaryOp::Sin => v.sin(),
            UnaryOp::Cos => v.cos(),
            UnaryOp::Tan => v.tan(),
            UnaryOp::Asin => v.asin(),
            UnaryOp::Acos => v.acos(),
            UnaryOp::Atan => v.atan(),
            UnaryOp::Exp => v.exp(),
            UnaryOp::Ln => v.ln(),
        }
    }

    fn apply_interval(self, v: Interval) -> Interval {
        match self {
            UnaryOp::Neg => -v,
            UnaryOp::Sqrt => v.sqrt(),
            UnaryOp::Abs => v.abs(),
            UnaryOp::Square => v.square(),
            UnaryOp::Sin => v.sin(),
            UnaryOp::Cos => v.cos(),
            UnaryOp::Tan => v.tan(),
            UnaryOp::Asin => v.asin(),
            UnaryOp::Acos => v.acos(),
            UnaryOp::Atan => v.atan(),
            UnaryOp::Exp => v.exp(),
            UnaryOp::Ln => v.ln(),
        }
    }
}

impl BinaryOp {
    pub fn token(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Min => 'i',
            BinaryOp::Max => 'a',
            BinaryOp::Pow => 'p',
            BinaryOp::Atan2 => 'A',
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "i" => BinaryOp::Min,
            "a" => BinaryOp::Max,
            "p" => BinaryOp::Pow,
            "A" => BinaryOp::Atan2,
            _ => return None,
        })
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Atan2 => a.atan2(b),
        }
    }

    fn apply_interval(self, a: Interval, b: Interval) -> Interval {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Pow => a.pow(b),
            BinaryOp::Atan2 => a.atan2(b),
        }
    }
}

/// Per-axis coordinate substitution; `None` leaves an axis unchanged
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Substitution {
    pub x: Option<Formula>,
    pub y: Option<Formula>,
    pub z: Option<Formula>,
}

impl Substitution {
    pub fn new(x: Option<Formula>, y: Option<Formula>, z: Option<Formula>) -> Self {
        Self { x, y, z }
    }

    pub fn is_identity(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Evaluate the substituted coordinates at a point
    pub fn eval(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        (
            self.x.as_ref().map_or(x, |f| f.eval(x, y, z)),
            self.y.as_ref().map_or(y, |f| f.eval(x, y, z)),
            self.z.as_ref().map_or(z, |f| f.eval(x, y, z)),
        )
    }

    /// Enclose the substituted coordinates over a box
    pub fn eval_interval(&self, x: Interval, y: Interval, z: Interval) -> [Interval; 3] {
        [
            self.x.as_ref().map_or(x, |f| f.eval_interval(x, y, z)),
            self.y.as_ref().map_or(y, |f| f.eval_interval(x, y, z)),
            self.z.as_ref().map_or(z, |f| f.eval_interval(x, y, z)),
        ]
    }
}

/// An implicit function of X, Y and Z
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    X,
    Y,
    Z,
    Const(f64),
    Unary(UnaryOp, Arc<Formula>),
    Binary(BinaryOp, Arc<Formula>, Arc<Formula>),
    Remap(Arc<Substitution>, Arc<Formula>),
}

impl Formula {
    pub fn constant(v: f64) -> Self {
        Formula::Const(v)
    }

    pub fn unary(op: UnaryOp, a: Formula) -> Self {
        if let Formula::Const(v) = a {
            return Formula::Const(op.apply(v));
        }
        Formula::Unary(op, Arc::new(a))
    }

    pub fn binary(op: BinaryOp, a: Formula, b: Formula) -> Self {
        if let (Formula::Const(x), Formula::Const(y)) = (&a, &b) {
            return Formula::Const(op.apply(*x, *y));
        }
        Formula::Binary(op, Arc::new(a), Arc::new(b))
    }

    pub fn min(a: Formula, b: Formula) -> Self {
        Self::binary(BinaryOp::Min, a, b)
    }

    pub fn max(a: Formula, b: Formula) -> Self {
        Self::binary(BinaryOp::Max, a, b)
    }

    pub fn sqrt(self) -> Self {
        Self::unary(UnaryOp::Sqrt, self)
    }

    pub fn abs(self) -> Self {
        Self::unary(UnaryOp::Abs, self)
    }

    pub fn square(self) -> Self {
        Self::unary(UnaryOp::Square, self)
    }

    pub fn sin(self) -> Self {
        Self::unary(UnaryOp::Sin, self)
    }

    pub fn cos(self) -> Self {
        Self::unary(UnaryOp::Cos, self)
    }

    pub fn exp(self) -> Self {
        Self::unary(UnaryOp::Exp, self)
    }

    pub fn pow(self, exponent: Formula) -> Self {
        Self::binary(BinaryOp::Pow, self, exponent)
    }

    /// Evaluate this formula at substituted coordinates
    pub fn remap(self, map: &Substitution) -> Self {
        if map.is_identity() || matches!(self, Formula::Const(_)) {
            return self;
        }
        Formula::Remap(Arc::new(map.clone()), Arc::new(self))
    }

    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        match self {
            Formula::X => x,
            Formula::Y => y,
            Formula::Z => z,
            Formula::Const(v) => *v,
            Formula::Unary(op, a) => op.apply(a.eval(x, y, z)),
            Formula::Binary(op, a, b) => op.apply(a.eval(x, y, z), b.eval(x, y, z)),
            Formula::Remap(map, inner) => {
                let (mx, my, mz) = map.eval(x, y, z);
                inner.eval(mx, my, mz)
            }
        }
    }

    pub fn eval_interval(&self, x: Interval, y: Interval, z: Interval) -> Interval {
        match self {
            Formula::X => x,
            Formula::Y => y,
            Formula::Z => z,
            Formula::Const(v) => Interval::point(*v),
            Formula::Unary(op, a) => op.apply_interval(a.eval_interval(x, y, z)),
            Formula::Binary(op, a, b) => {
                op.apply_interval(a.eval_interval(x, y, z), b.eval_interval(x, y, z))
            }
            Formula::Remap(map, inner) => {
                let [mx, my, mz] = map.eval_interval(x, y, z);
                inner.eval_interval(mx, my, mz)
            }
        }
    }

    /// Number of operator nodes, counting shared subtrees once per use
    pub fn node_count(&self) -> usize {
        match self {
            Formula::X | Formula::Y | Formula::Z | Formula::Const(_) => 1,
            Formula::Unary(_, a) => 1 + a.node_count(),
            Formula::Binary(_, a, b) => 1 + a.node_count() + b.node_count(),
            Formula::Remap(map, inner) => {
                let axes = [&map.x, &map.y, &map.z]
                    .iter()
                    .map(|f| f.as_ref().map_or(1, |f| f.node_count()))
                    .sum::<usize>();
                1 + axes + inner.node_count()
            }
        }
    }

    /// Longest operator chain from the root to a leaf
    pub fn depth(&self) -> usize {
        match self {
            Formula::X | Formula::Y | Formula::Z | Formula::Const(_) => 1,
            Formula::Unary(_, a) => 1 + a.depth(),
            Formula::Binary(_, a, b) => 1 + a.depth().max(b.depth()),
            Formula::Remap(map, inner) => {
                let axes = [&map.x, &map.y, &map.z]
                    .iter()
                    .map(|f| f.as_ref().map_or(0, |f| f.depth()))
                    .max()
                    .unwrap_or(0);
                1 + axes.max(inner.depth())
            }
        }
    }

    /// Render in prefix notation
    pub fn to_prefix(&self) -> String {
        let mut out = String::new();
        self.write_prefix(&mut out);
        out
    }

    fn write_prefix(&self, out: &mut String) {
        if !out.is_empty() {
            out.push(' ');
        }
        match self {
            Formula::X => out.push('X'),
            Formula::Y => out.push('Y'),
            Formula::Z => out.push('Z'),
            Formula::Const(v) => {
                out.push('f');
                out.push_str(&v.to_string());
            }
            Formula::Unary(op, a) => {
                out.push(op.token());
                a.write_prefix(out);
            }
            Formula::Binary(op, a, b) => {
                out.push(op.token());
                a.write_prefix(out);
                b.write_prefix(out);
            }
            Formula::Remap(map, inner) => {
                out.push('m');
                for axis in [&map.x, &map.y, &map.z] {
                    match axis {
                        Some(f) => f.write_prefix(out),
                        None => out.push_str(" _"),
                    }
                }
                inner.write_prefix(out);
            }
        }
    }

    /// Parse prefix notation produced by [`Formula::to_prefix`]
    pub fn from_prefix(text: &str) -> Result<Formula, PrefixError> {
        let mut tokens = text.split_whitespace().peekable();
        let formula = parse_prefix(&mut tokens)?;
        let trailing = tokens.count();
        if trailing > 0 {
            return Err(PrefixError::TrailingTokens(trailing));
        }
        Ok(formula)
    }
}

/// Error raised when decoding prefix notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown token '{0}'")]
    UnknownToken(String),

    #[error("{0} tokens left after a complete formula")]
    TrailingTokens(usize),
}

type Tokens<'a> = Peekable<SplitWhitespace<'a>>;

fn parse_prefix(tokens: &mut Tokens<'_>) -> Result<Formula, PrefixError> {
    let token = tokens.next().ok_or(PrefixError::UnexpectedEnd)?;
    match token {
        "X" => Ok(Formula::X),
        "Y" => Ok(Formula::Y),
        "Z" => Ok(Formula::Z),
        "m" => {
            let x = parse_axis(tokens)?;
            let y = parse_axis(tokens)?;
            let z = parse_axis(tokens)?;
            let inner = parse_prefix(tokens)?;
            Ok(Formula::Remap(Arc::new(Substitution { x, y, z }), Arc::new(inner)))
        }
        t if t.starts_with('f') && t.len() > 1 => t[1..]
            .parse::<f64>()
            .map(Formula::Const)
            .map_err(|_| PrefixError::UnknownToken(t.to_string())),
        t => {
            if let Some(op) = UnaryOp::from_token(t) {
                let a = parse_prefix(tokens)?;
                Ok(Formula::Unary(op, Arc::new(a)))
            } else if let Some(op) = BinaryOp::from_token(t) {
                let a = parse_prefix(tokens)?;
                let b = parse_prefix(tokens)?;
                Ok(Formula::Binary(op, Arc::new(a), Arc::new(b)))
            } else {
                Err(PrefixError::UnknownToken(t.to_string()))
            }
        }
    }
}

fn parse_axis(tokens: &mut Tokens<'_>) -> Result<Option<Formula>, PrefixError> {
    if tokens.peek() == Some(&"_") {
        tokens.next();
        return Ok(None);
    }
    parse_prefix(tokens).map(Some)
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_prefix())
    }
}

impl From<f64> for Formula {
    fn from(v: f64) -> Self {
        Formula::Const(v)
    }
}

macro_rules! formula_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Formula {
            type Output = Formula;

            fn $method(self, rhs: Formula) -> Formula {
                Formula::binary($op, self, rhs)
            }
        }

        impl $trait<f64> for Formula {
            type Output = Formula;

            fn $method(self, rhs: f64) -> Formula {
                Formula::binary($op, self, Formula::Const(rhs))
            }
        }

        impl $trait<Formula> for f64 {
            type Output = Formula;

            fn $method(self, rhs: Formula) -> Formula {
                Formula::binary($op, Formula::Const(self), rhs)
            }
        }
    };
}

formula_binop!(Add, add, BinaryOp::Add);
formula_binop!(Sub, sub, BinaryOp::Sub);
formula_binop!(Mul, mul, BinaryOp::Mul);
formula_binop!(Div, div, BinaryOp::Div);

impl Neg for Formula {
    type Output = Formula;

    fn neg(self) -> Formula {
        Formula::unary(UnaryOp::Neg, self)
    }
}
