// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Expressions: immutable formula + bounds pairs and the transforms between them

use super::{Bounds, Formula, Substitution};
use nalgebra::Point3;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not, Sub};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// How a transform carries bounds across
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsRule {
    /// Map the old box through the inverse substitution with interval arithmetic
    Inverse(Substitution),
    /// Revolution about an axis parallel to `axis` passing through `center`
    /// on the profile axis; the radius is the largest distance of the old
    /// box from the axis
    Revolve { axis: Axis, center: f64 },
    /// Grow every finite side by a fixed amount
    Grow(f64),
}

/// Forward coordinate substitution plus the rule for remapping bounds.
///
/// The forward substitution is applied to the formula: `X` in the result
/// reads the original shape at `forward.x(X, Y, Z)`. Bounds cannot be remapped
/// with the forward map, so each transform carries its own [`BoundsRule`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub forward: Substitution,
    pub bounds: BoundsRule,
}

impl Transform {
    pub fn new(forward: Substitution, inverse: Substitution) -> Self {
        Self {
            forward,
            bounds: BoundsRule::Inverse(inverse),
        }
    }

    pub fn with_rule(forward: Substitution, bounds: BoundsRule) -> Self {
        Self { forward, bounds }
    }

    pub fn apply_to_bounds(&self, bounds: &Bounds) -> Bounds {
        if bounds.is_empty() {
            return *bounds;
        }
        match &self.bounds {
            BoundsRule::Inverse(inverse) => {
                let [x, y, z] = bounds.intervals();
                let [x, y, z] = inverse.eval_interval(x, y, z);
                Bounds::from_intervals(x, y, z)
            }
            BoundsRule::Revolve { axis, center } => revolve_bounds(bounds, *axis, *center),
            BoundsRule::Grow(amount) => bounds.grow(*amount),
        }
    }
}

fn revolve_bounds(bounds: &Bounds, axis: Axis, center: f64) -> Bounds {
    // (profile axis, swept axis); the revolution axis itself is untouched
    let (profile, swept) = match axis {
        Axis::X => (1, 2),
        Axis::Y => (0, 2),
        Axis::Z => (0, 1),
    };
    let r = (bounds.min[profile] - center)
        .abs()
        .max((bounds.max[profile] - center).abs());

    let mut out = *bounds;
    out.min[profile] = center - r;
    out.max[profile] = center + r;
    out.min[swept] = -r;
    out.max[swept] = r;
    out
}

/// An implicit shape: a formula that is negative inside, plus bounds that
/// enclose every inside point
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    formula: Formula,
    bounds: Bounds,
}

impl Expression {
    pub fn new(formula: Formula, bounds: Bounds) -> Self {
        Self { formula, bounds }
    }

    /// A shape with no inside points
    pub fn empty() -> Self {
        Self::new(Formula::constant(1.0), Bounds::empty())
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn with_bounds(&self, bounds: Bounds) -> Self {
        Self::new(self.formula.clone(), bounds)
    }

    pub fn union(&self, other: &Expression) -> Self {
        Self::new(
            Formula::min(self.formula.clone(), other.formula.clone()),
            self.bounds.union(&other.bounds),
        )
    }

    pub fn intersection(&self, other: &Expression) -> Self {
        Self::new(
            Formula::max(self.formula.clone(), other.formula.clone()),
            self.bounds.intersect(&other.bounds),
        )
    }

    /// Union of every shape, or the empty shape when there are none.
    ///
    /// Operands are joined pairwise so the formula depth grows with the log
    /// of the count rather than the count itself.
    pub fn union_all(shapes: impl IntoIterator<Item = Expression>) -> Self {
        balanced(shapes.into_iter().collect(), Self::union).unwrap_or_else(Self::empty)
    }

    /// Intersection of every shape, or the empty shape when there are none
    pub fn intersection_all(shapes: impl IntoIterator<Item = Expression>) -> Self {
        balanced(shapes.into_iter().collect(), Self::intersection).unwrap_or_else(Self::empty)
    }

    /// Everything outside this shape; the result is unbounded
    pub fn complement(&self) -> Self {
        Self::new(-self.formula.clone(), Bounds::everything())
    }

    pub fn difference(&self, other: &Expression) -> Self {
        self.intersection(&other.complement())
    }

    pub fn map(&self, transform: &Transform) -> Self {
        Self::new(
            self.formula.clone().remap(&transform.forward),
            transform.apply_to_bounds(&self.bounds),
        )
    }

    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        self.formula.eval(x, y, z)
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.eval(point.x, point.y, point.z) <= 0.0
    }

    pub fn to_prefix(&self) -> String {
        self.formula.to_prefix()
    }
}

impl Default for Expression {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.bounds.to_array();
        write!(
            f,
            "{} [{}, {}, {}] .. [{}, {}, {}]",
            self.formula, xmin, ymin, zmin, xmax, ymax, zmax
        )
    }
}

impl BitOr for &Expression {
    type Output = Expression;

    fn bitor(self, rhs: &Expression) -> Expression {
        self.union(rhs)
    }
}

impl BitOr for Expression {
    type Output = Expression;

    fn bitor(self, rhs: Expression) -> Expression {
        self.union(&rhs)
    }
}

impl BitAnd for &Expression {
    type Output = Expression;

    fn bitand(self, rhs: &Expression) -> Expression {
        self.intersection(rhs)
    }
}

impl BitAnd for Expression {
    type Output = Expression;

    fn bitand(self, rhs: Expression) -> Expression {
        self.intersection(&rhs)
    }
}

fn balanced(
    mut layer: Vec<Expression>,
    op: fn(&Expression, &Expression) -> Expression,
) -> Option<Expression> {
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut items = layer.into_iter();
        while let Some(a) = items.next() {
            next.push(match items.next() {
                Some(b) => op(&a, &b),
                None => a,
            });
        }
        layer = next;
    }
    layer.pop()
}

impl Sub for &Expression {
    type Output = Expression;

    fn sub(self, rhs: &Expression) -> Expression {
        self.difference(rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        self.difference(&rhs)
    }
}

impl Not for &Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        self.complement()
    }
}

impl Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        self.complement()
    }
}
