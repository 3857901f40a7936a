// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Primitive shape constructors
//!
//! Every primitive carries exact bounds. 2D primitives live in the XY plane
//! and are unbounded along Z.

use super::{Bounds, Expression, Formula};

fn dx(x: f64) -> Formula {
    Formula::X - x
}

fn dy(y: f64) -> Formula {
    Formula::Y - y
}

fn dz(z: f64) -> Formula {
    Formula::Z - z
}

/// Distance from the point `(a, b)` in the plane of two coordinate formulas
fn hypot(a: Formula, b: Formula) -> Formula {
    (a.square() + b.square()).sqrt()
}

/// `Z` clamped between two planes
fn slab_z(zmin: f64, zmax: f64) -> Formula {
    Formula::max(zmin - Formula::Z, Formula::Z - zmax)
}

pub fn circle(x: f64, y: f64, r: f64) -> Expression {
    Expression::new(hypot(dx(x), dy(y)) - r, Bounds::flat(x - r, y - r, x + r, y + r))
}

pub fn rectangle(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Expression {
    let f = Formula::max(
        Formula::max(xmin - Formula::X, Formula::X - xmax),
        Formula::max(ymin - Formula::Y, Formula::Y - ymax),
    );
    Expression::new(f, Bounds::flat(xmin, ymin, xmax, ymax))
}

/// Triangle from three vertices in any order.
///
/// Vertices are sorted by polar angle about the centroid so the edge
/// half-planes always wind counter-clockwise.
pub fn triangle(x0: f64, y0: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> Expression {
    let cx = (x0 + x1 + x2) / 3.0;
    let cy = (y0 + y1 + y2) / 3.0;
    let mut vertices = [(x0, y0), (x1, y1), (x2, y2)];
    vertices.sort_by(|a, b| {
        let ta = (a.1 - cy).atan2(a.0 - cx);
        let tb = (b.1 - cy).atan2(b.0 - cx);
        ta.total_cmp(&tb)
    });

    let edge = |(ax, ay): (f64, f64), (bx, by): (f64, f64)| {
        let len = (bx - ax).hypot(by - ay);
        let len = if len > 0.0 { len } else { 1.0 };
        // Negative on the left of a->b
        ((by - ay) * dx(ax) - (bx - ax) * dy(ay)) / len
    };

    let f = Formula::max(
        Formula::max(edge(vertices[0], vertices[1]), edge(vertices[1], vertices[2])),
        edge(vertices[2], vertices[0]),
    );
    let bounds = Bounds::flat(
        x0.min(x1).min(x2),
        y0.min(y1).min(y2),
        x0.max(x1).max(x2),
        y0.max(y1).max(y2),
    );
    Expression::new(f, bounds)
}

pub fn sphere(x: f64, y: f64, z: f64, r: f64) -> Expression {
    let f = (dx(x).square() + dy(y).square() + dz(z).square()).sqrt() - r;
    Expression::new(
        f,
        Bounds::from_extents(x - r, y - r, z - r, x + r, y + r, z + r),
    )
}

pub fn cube(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> Expression {
    let f = Formula::max(
        rectangle(xmin, xmax, ymin, ymax).formula().clone(),
        slab_z(zmin, zmax),
    );
    Expression::new(f, Bounds::from_extents(xmin, ymin, zmin, xmax, ymax, zmax))
}

pub fn cylinder(x: f64, y: f64, zmin: f64, zmax: f64, r: f64) -> Expression {
    let f = Formula::max(hypot(dx(x), dy(y)) - r, slab_z(zmin, zmax));
    Expression::new(
        f,
        Bounds::from_extents(x - r, y - r, zmin, x + r, y + r, zmax),
    )
}

/// Cone with its base of radius `r` at `zmin` and its apex at `zmax`
pub fn cone(x: f64, y: f64, zmin: f64, zmax: f64, r: f64) -> Expression {
    let radius = r * (zmax - Formula::Z) / (zmax - zmin);
    let f = Formula::max(hypot(dx(x), dy(y)) - radius, slab_z(zmin, zmax));
    Expression::new(
        f,
        Bounds::from_extents(x - r, y - r, zmin, x + r, y + r, zmax),
    )
}

/// Pyramid with a rectangular base at `zmin` and its apex centered at `zmax`
pub fn pyramid(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> Expression {
    let cx = (xmin + xmax) / 2.0;
    let cy = (ymin + ymax) / 2.0;
    let hw = (xmax - xmin) / 2.0;
    let hh = (ymax - ymin) / 2.0;
    let taper = (zmax - Formula::Z) / (zmax - zmin);

    let f = Formula::max(
        Formula::max(
            dx(cx).abs() - hw * taper.clone(),
            dy(cy).abs() - hh * taper,
        ),
        slab_z(zmin, zmax),
    );
    Expression::new(f, Bounds::from_extents(xmin, ymin, zmin, xmax, ymax, zmax))
}

/// Torus around an axis parallel to X through `(x, y, z)`
pub fn torus_x(x: f64, y: f64, z: f64, major: f64, minor: f64) -> Expression {
    let ring = hypot(dy(y), dz(z)) - major;
    let outer = major + minor;
    Expression::new(
        hypot(ring, dx(x)) - minor,
        Bounds::from_extents(x - minor, y - outer, z - outer, x + minor, y + outer, z + outer),
    )
}

/// Torus around an axis parallel to Y through `(x, y, z)`
pub fn torus_y(x: f64, y: f64, z: f64, major: f64, minor: f64) -> Expression {
    let ring = hypot(dx(x), dz(z)) - major;
    let outer = major + minor;
    Expression::new(
        hypot(ring, dy(y)) - minor,
        Bounds::from_extents(x - outer, y - minor, z - outer, x + outer, y + minor, z + outer),
    )
}

/// Torus around an axis parallel to Z through `(x, y, z)`
pub fn torus_z(x: f64, y: f64, z: f64, major: f64, minor: f64) -> Expression {
    let ring = hypot(dx(x), dy(y)) - major;
    let outer = major + minor;
    Expression::new(
        hypot(ring, dz(z)) - minor,
        Bounds::from_extents(x - outer, y - outer, z - minor, x + outer, y + outer, z + minor),
    )
}
