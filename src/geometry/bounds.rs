// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Axis-aligned bounds with infinite (unknown) sides

use super::Interval;
use crate::utils::math::approx_eq;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// Any side may be infinite, meaning "unknown in that direction". A box with
/// `min > max` on some axis is empty; it is kept as-is rather than normalized
/// so that an intersection of disjoint operands stays visibly empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "BoundsRepr", try_from = "BoundsRepr")]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn from_extents(xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            min: Point3::new(xmin, ymin, zmin),
            max: Point3::new(xmax, ymax, zmax),
        }
    }

    /// A 2D box, unbounded along Z
    pub fn flat(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self::from_extents(xmin, ymin, f64::NEG_INFINITY, xmax, ymax, f64::INFINITY)
    }

    /// The box that knows nothing
    pub fn everything() -> Self {
        Self::from_extents(
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
        )
    }

    /// The identity for [`Bounds::union`]
    pub fn empty() -> Self {
        Self::from_extents(
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn from_intervals(x: Interval, y: Interval, z: Interval) -> Self {
        Self::from_extents(x.lo, y.lo, z.lo, x.hi, y.hi, z.hi)
    }

    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.expand_to_include(point);
        }
        bounds
    }

    /// `[xmin, ymin, zmin, xmax, ymax, zmax]`
    pub fn to_array(&self) -> [f64; 6] {
        [self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
    }

    pub fn axis(&self, axis: usize) -> Interval {
        Interval::new(self.min[axis], self.max[axis])
    }

    pub fn intervals(&self) -> [Interval; 3] {
        [self.axis(0), self.axis(1), self.axis(2)]
    }

    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Componentwise min of mins and max of maxes
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Componentwise max of mins and min of maxes; may come out inverted
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        }
    }

    /// True if `other` lies entirely inside this box
    pub fn contains(&self, other: &Bounds) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    pub fn contains_point(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    /// True if some axis is inverted, so the box holds no points
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn has_xy_extent(&self) -> bool {
        self.min.x.is_finite() && self.max.x.is_finite() && self.min.y.is_finite() && self.max.y.is_finite()
    }

    pub fn has_xyz_extent(&self) -> bool {
        self.has_xy_extent() && self.min.z.is_finite() && self.max.z.is_finite()
    }

    /// Replace the Z interval, keeping X and Y
    pub fn with_z(&self, zmin: f64, zmax: f64) -> Bounds {
        let mut out = *self;
        out.min.z = zmin;
        out.max.z = zmax;
        out
    }

    /// Push every side outward by `amount`; infinite sides stay infinite
    pub fn grow(&self, amount: f64) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        Bounds {
            min: self.min.map(|v| v - amount),
            max: self.max.map(|v| v + amount),
        }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Check if two boxes are approximately equal within tolerance
    pub fn approx_eq(&self, other: &Bounds, tolerance: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| approx_eq(*a, *b, tolerance))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::everything()
    }
}

/// JSON cannot carry infinities, so unbounded sides travel as strings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Extent {
    Finite(f64),
    Symbolic(Infinity),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Infinity {
    #[serde(rename = "inf")]
    Positive,
    #[serde(rename = "-inf")]
    Negative,
}

impl From<f64> for Extent {
    fn from(value: f64) -> Self {
        if value == f64::INFINITY {
            Extent::Symbolic(Infinity::Positive)
        } else if value == f64::NEG_INFINITY {
            Extent::Symbolic(Infinity::Negative)
        } else {
            Extent::Finite(value)
        }
    }
}

impl From<Extent> for f64 {
    fn from(extent: Extent) -> Self {
        match extent {
            Extent::Finite(v) => v,
            Extent::Symbolic(Infinity::Positive) => f64::INFINITY,
            Extent::Symbolic(Infinity::Negative) => f64::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoundsRepr {
    xmin: Extent,
    ymin: Extent,
    zmin: Extent,
    xmax: Extent,
    ymax: Extent,
    zmax: Extent,
}

impl From<Bounds> for BoundsRepr {
    fn from(b: Bounds) -> Self {
        Self {
            xmin: b.min.x.into(),
            ymin: b.min.y.into(),
            zmin: b.min.z.into(),
            xmax: b.max.x.into(),
            ymax: b.max.y.into(),
            zmax: b.max.z.into(),
        }
    }
}

impl TryFrom<BoundsRepr> for Bounds {
    type Error = String;

    fn try_from(r: BoundsRepr) -> Result<Self, Self::Error> {
        let bounds = Bounds::from_extents(
            r.xmin.into(),
            r.ymin.into(),
            r.zmin.into(),
            r.xmax.into(),
            r.ymax.into(),
            r.zmax.into(),
        );
        if bounds.to_array().iter().any(|v| v.is_nan()) {
            return Err("bounds may not contain NaN".to_string());
        }
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let mut bbox = Bounds::empty();
        bbox.expand_to_include(&Point3::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Point3::new(-1.0, -2.0, -3.0));

        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Point3::new(0.0, 0.0, 0.0));
        assert!(bbox.has_xyz_extent());
    }

    #[test]
    fn test_union_and_intersection() {
        let a = Bounds::flat(-5.0, -5.0, 5.0, 5.0);
        let b = Bounds::flat(5.0, -5.0, 15.0, 5.0);

        let u = a.union(&b);
        assert_eq!(u, Bounds::flat(-5.0, -5.0, 15.0, 5.0));
        assert!(u.contains(&a) && u.contains(&b));

        let i = a.intersect(&b);
        assert_eq!(i.min.x, 5.0);
        assert_eq!(i.max.x, 5.0);
        assert!(a.contains(&i) && b.contains(&i));
    }

    #[test]
    fn test_disjoint_intersection_is_inverted() {
        let a = Bounds::from_extents(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = Bounds::from_extents(2.0, 0.0, 0.0, 3.0, 1.0, 1.0);
        let i = a.intersect(&b);
        assert!(i.is_empty());
        assert_eq!(i.min.x, 2.0);
        assert_eq!(i.max.x, 1.0);
    }

    #[test]
    fn test_extent_checks() {
        let flat = Bounds::flat(0.0, 0.0, 1.0, 1.0);
        assert!(flat.has_xy_extent());
        assert!(!flat.has_xyz_extent());
        assert!(!Bounds::everything().has_xy_extent());
    }

    #[test]
    fn test_grow_keeps_unknown_sides() {
        let grown = Bounds::flat(0.0, 0.0, 1.0, 1.0).grow(0.5);
        assert_eq!(grown.min.x, -0.5);
        assert_eq!(grown.max.y, 1.5);
        assert_eq!(grown.min.z, f64::NEG_INFINITY);
        assert_eq!(grown.max.z, f64::INFINITY);
        assert!(Bounds::empty().grow(1.0).is_empty());
    }

    #[test]
    fn test_json_carries_infinity() {
        let flat = Bounds::flat(-1.0, -2.0, 1.0, 2.0);
        let json = serde_json::to_string(&flat).unwrap();
        assert!(json.contains("\"-inf\""));
        let back: Bounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flat);
    }
}
